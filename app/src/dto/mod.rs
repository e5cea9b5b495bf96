mod inventory;

pub use self::inventory::{read_inventory, select_rigs, Rig};
