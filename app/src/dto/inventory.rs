use std::io;

use serde::Deserialize;

/// One row of the rig inventory CSV. Extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rig {
    pub rig_number: u32,
    #[serde(rename = "IP_address")]
    pub ip_address: String,
}

pub fn read_inventory<R: io::Read>(reader: R) -> csv::Result<Vec<Rig>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect()
}

/// Keeps the rigs named in `wanted`, in that order; an empty `wanted` keeps all of them.
pub fn select_rigs(rigs: Vec<Rig>, wanted: &[u32]) -> anyhow::Result<Vec<Rig>> {
    if wanted.is_empty() {
        return Ok(rigs);
    }
    wanted
        .iter()
        .map(|number| {
            rigs.iter()
                .find(|rig| rig.rig_number == *number)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Rig {number} is not in the inventory"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    const INVENTORY: &str = indoc! {"
        rig_number,IP_address,location
        50, 192.168.1.50 ,bench
        51,192.168.1.51,bench
        52,192.168.1.52,shelf
    "};

    #[test]
    fn parse() {
        let rigs = read_inventory(INVENTORY.as_bytes()).unwrap();
        assert_eq!(rigs.len(), 3);
        assert_eq!(
            rigs[0],
            Rig {
                rig_number: 50,
                ip_address: "192.168.1.50".to_owned()
            }
        );
    }

    #[test]
    fn select() {
        let rigs = read_inventory(INVENTORY.as_bytes()).unwrap();
        let picked = select_rigs(rigs.clone(), &[52, 50]).unwrap();
        assert_eq!(
            picked.iter().map(|r| r.rig_number).collect::<Vec<_>>(),
            [52, 50]
        );
        assert_eq!(select_rigs(rigs.clone(), &[]).unwrap().len(), 3);
        assert!(select_rigs(rigs, &[7]).is_err());
    }
}
