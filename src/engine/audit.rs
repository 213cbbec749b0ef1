use serde::Serialize;

use crate::constants::FOOTPRINT;
use crate::error::LevelError;
use crate::level::LevelConfig;
use crate::movement::{is_move_valid, reachable_tiles};
use crate::pathfinding::find_path;
use crate::types::{Direction, GhostKind, Tile};

#[derive(Clone, Debug, Serialize)]
pub struct AnchorReport {
    pub kind: GhostKind,
    pub anchor: Tile,
    /// Reachable tile closest to the anchor.
    pub nearest: Tile,
    #[serde(rename = "pathLen")]
    pub path_len: usize,
    pub reached: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct LevelAudit {
    pub level: String,
    #[serde(rename = "reachableTiles")]
    pub reachable_tiles: usize,
    pub collectibles: usize,
    #[serde(rename = "playerStartReachable")]
    pub player_start_reachable: bool,
    pub anchors: Vec<AnchorReport>,
    /// Reachable tiles with a single way in and out.
    #[serde(rename = "deadEnds")]
    pub dead_ends: Vec<Tile>,
}

impl LevelAudit {
    pub fn is_clean(&self) -> bool {
        self.player_start_reachable
            && self.dead_ends.is_empty()
            && self.anchors.iter().all(|anchor| anchor.reached)
    }
}

pub fn audit_level(level: &LevelConfig) -> Result<LevelAudit, LevelError> {
    let grid = level.build_grid()?;
    let reachable = reachable_tiles(&grid, level.den_exit);

    let start_path = find_path(&grid, level.den_exit, level.player_start, FOOTPRINT);
    let player_start_reachable = start_path.last() == Some(&level.player_start);

    let mut anchors = Vec::new();
    for kind in GhostKind::ALL {
        let anchor = level.scatter_target(kind);
        let nearest = reachable
            .iter()
            .copied()
            .min_by(|a, b| a.euclidean(anchor).total_cmp(&b.euclidean(anchor)))
            .unwrap_or(level.den_exit);
        let path = find_path(&grid, level.den_exit, nearest, FOOTPRINT);
        anchors.push(AnchorReport {
            kind,
            anchor,
            nearest,
            path_len: path.len().saturating_sub(1),
            reached: path.last() == Some(&nearest),
        });
    }

    let dead_ends = reachable
        .iter()
        .copied()
        .filter(|tile| {
            Direction::PRIORITY
                .into_iter()
                .filter(|dir| is_move_valid(&grid, *tile, *dir))
                .count()
                < 2
        })
        .collect();

    Ok(LevelAudit {
        level: level.name.clone(),
        reachable_tiles: reachable.len(),
        collectibles: grid.collectibles_left(),
        player_start_reachable,
        anchors,
        dead_ends,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{builtin_level, parse_level};

    #[test]
    fn builtin_level_is_clean() {
        let level = builtin_level().expect("level");
        let audit = audit_level(&level).expect("audit");
        assert!(audit.dead_ends.is_empty(), "dead ends: {:?}", audit.dead_ends);
        assert!(audit.player_start_reachable);
        assert!(audit.anchors.iter().all(|anchor| anchor.reached));
        assert!(audit.reachable_tiles > 200);
        assert!(audit.is_clean());
    }

    #[test]
    fn dead_end_spur_is_reported() {
        let doc = serde_json::json!({
            "name": "spur",
            "layout": [
                "########",
                "#      #",
                "#      #",
                "#  #####",
                "#  #####",
                "########"
            ],
            "playerStart": [1, 4],
            "ghostDen": [1, 1],
            "denExit": [1, 1],
            "scatterTimes": [5]
        });
        let level = parse_level(&doc.to_string()).expect("level");
        let audit = audit_level(&level).expect("audit");
        assert!(audit.dead_ends.contains(&Tile::new(3, 1)));
        assert!(audit.dead_ends.contains(&Tile::new(1, 5)));
        assert!(!audit.is_clean());
    }
}
