//! Built-in level catalog: map sizes, landing platforms and wormholes.
//!
//! Map art is loaded by the host. For headless runs every level can also
//! produce a plain map with its platforms drawn in.

use crate::components::{LevelId, MAX_SHIPS, Platform};
use crate::terrain::{Color, Rect, TerrainBuffer};

pub const DEFAULT_LEVEL: LevelId = 6;
pub const LEVEL_COUNT: LevelId = 7;

const BASE_WIDTH: i32 = 792;
const BASE_HEIGHT: i32 = 1200;

/// Colour used for platforms on generated maps.
pub const PLATFORM_COLOR: Color = Color(128, 128, 128);

/// Which side of the trigger line a wormhole catches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    AtMost(i32),
    AtLeast(i32),
}

/// Teleport zone: ships whose integer position falls in the zone are moved
/// to `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wormhole {
    pub min_x: i32,
    pub max_x: i32,
    pub y: Threshold,
    pub destination: (i32, i32),
}

impl Wormhole {
    pub fn captures(&self, (x, y): (i32, i32)) -> bool {
        let in_band = match self.y {
            Threshold::AtMost(limit) => y <= limit,
            Threshold::AtLeast(limit) => y >= limit,
        };
        in_band && (self.min_x..=self.max_x).contains(&x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub id: LevelId,
    pub width: i32,
    pub height: i32,
    pub platforms: &'static [Platform],
    pub wormholes: &'static [Wormhole],
}

impl Level {
    /// Look up a built-in level. Ids outside `1..=7` have no level.
    pub fn get(id: LevelId) -> Option<Level> {
        let (platforms, wormholes, scale): (&'static [Platform], &'static [Wormhole], (i32, i32)) =
            match id {
                1 => (LEVEL_1, LEVEL_1_WORMHOLES, (1, 1)),
                2 => (LEVEL_2, &[], (1, 1)),
                3 => (LEVEL_3, &[], (1, 1)),
                4 => (LEVEL_4, &[], (1, 1)),
                5 => (LEVEL_5, &[], (1, 1)),
                6 => (LEVEL_6, &[], (2, 2)),
                7 => (LEVEL_7, &[], (2, 3)),
                _ => return None,
            };
        Some(Level {
            id,
            width: BASE_WIDTH * scale.0,
            height: BASE_HEIGHT * scale.1,
            platforms,
            wormholes,
        })
    }

    /// Spawn platform for a ship slot (ship `n` uses platform `n - 1`).
    pub fn spawn_platform(&self, ship_id: u8) -> Option<&Platform> {
        let index = usize::from(ship_id).checked_sub(1)?;
        if index >= MAX_SHIPS {
            return None;
        }
        self.platforms.get(index)
    }

    pub fn wormhole_at(&self, position: (i32, i32)) -> Option<&Wormhole> {
        self.wormholes.iter().find(|w| w.captures(position))
    }

    /// Empty map of the level's size with each platform drawn as a strip
    /// starting at its flat row.
    pub fn generated_map(&self, background: Color) -> TerrainBuffer {
        let mut map = TerrainBuffer::new(self.width, self.height, background);
        for platform in self.platforms {
            map.fill_rect(
                Rect::new(
                    platform.min_x,
                    platform.flat_y,
                    platform.max_x - platform.min_x + 1,
                    4,
                ),
                PLATFORM_COLOR,
            );
        }
        map
    }
}

const fn p(min_x: i32, max_x: i32, flat_y: i32) -> Platform {
    Platform::new(min_x, max_x, flat_y)
}

static LEVEL_1_WORMHOLES: &[Wormhole] = &[
    Wormhole {
        min_x: 174,
        max_x: 184,
        y: Threshold::AtMost(160),
        destination: (344, 1052),
    },
    Wormhole {
        min_x: 339,
        max_x: 349,
        y: Threshold::AtLeast(1053),
        destination: (179, 165),
    },
];

static LEVEL_1: &[Platform] = &[
    p(464, 513, 333),
    p(60, 127, 1045),
    p(428, 497, 531),
    p(504, 568, 985),
    p(178, 241, 875),
    p(8, 37, 187),
    p(302, 351, 271),
    p(434, 521, 835),
    p(499, 586, 1165),
    p(68, 145, 1181),
];

static LEVEL_2: &[Platform] = &[
    p(201, 259, 175),
    p(21, 92, 1087),
    p(552, 615, 513),
    p(468, 525, 915),
    p(546, 599, 327),
    p(8, 37, 187),
    p(660, 697, 447),
    p(350, 435, 621),
    p(596, 697, 1141),
];

static LEVEL_3: &[Platform] = &[
    p(14, 65, 111),
    p(38, 93, 1121),
    p(713, 760, 231),
    p(473, 540, 617),
    p(565, 616, 459),
    p(343, 398, 207),
    p(316, 385, 805),
    p(492, 548, 987),
    p(66, 145, 1180),
];

static LEVEL_4: &[Platform] = &[
    p(19, 69, 111),
    p(32, 84, 1121),
    p(705, 755, 231),
    p(487, 547, 617),
    p(556, 607, 459),
    p(344, 393, 207),
    p(326, 377, 805),
    p(502, 554, 987),
    p(66, 145, 1180),
];

static LEVEL_5: &[Platform] = &[
    p(504, 568, 985),
    p(464, 513, 333),
    p(428, 497, 531),
    p(178, 241, 875),
    p(8, 37, 187),
    p(302, 351, 271),
    p(434, 521, 835),
    p(434, 521, 835),
    p(60, 127, 1045),
    p(348, 377, 1089),
    p(499, 586, 1165),
    p(68, 145, 1181),
];

static LEVEL_6: &[Platform] = &[
    p(464, 513, 333),
    p(60, 127, 1045),
    p(428, 497, 531),
    p(504, 568, 985),
    p(178, 241, 875),
    p(8, 37, 187),
    p(302, 351, 271),
    p(434, 521, 835),
    p(499, 586, 1165),
    p(68, 145, 1181),
    p(993, 1051, 175),
    p(813, 884, 1087),
    p(1344, 1407, 513),
    p(1260, 1317, 915),
    p(1338, 1391, 327),
    p(1452, 1489, 447),
    p(1142, 1227, 621),
    p(1388, 1489, 1141),
    p(806, 857, 1311),
    p(830, 885, 2321),
    p(1505, 1552, 1431),
    p(1265, 1332, 1817),
    p(1357, 1408, 1659),
    p(1135, 1190, 1407),
    p(1108, 1177, 2005),
    p(1284, 1340, 2187),
    p(858, 937, 2380),
    p(19, 69, 1311),
    p(32, 84, 2321),
    p(705, 755, 1431),
    p(487, 547, 1817),
    p(556, 607, 1659),
    p(344, 393, 1407),
    p(326, 377, 2005),
    p(502, 554, 2187),
    p(66, 145, 2380),
];

static LEVEL_7: &[Platform] = &[
    p(464, 513, 333),
    p(60, 127, 1045),
    p(428, 497, 531),
    p(504, 568, 985),
    p(178, 241, 875),
    p(8, 37, 187),
    p(302, 351, 271),
    p(434, 521, 835),
    p(499, 586, 1165),
    p(68, 145, 1181),
    p(993, 1051, 175),
    p(813, 884, 1087),
    p(1344, 1407, 513),
    p(1260, 1317, 915),
    p(1338, 1391, 327),
    p(1452, 1489, 447),
    p(1142, 1227, 621),
    p(1388, 1489, 1141),
    p(806, 857, 1311),
    p(830, 885, 2321),
    p(1505, 1552, 1431),
    p(1265, 1332, 1817),
    p(1357, 1408, 1659),
    p(1135, 1190, 1407),
    p(1108, 1177, 2005),
    p(1284, 1340, 2187),
    p(858, 937, 2380),
    p(19, 69, 1311),
    p(32, 84, 2321),
    p(705, 755, 1431),
    p(487, 547, 1817),
    p(556, 607, 1659),
    p(344, 393, 1407),
    p(326, 377, 2005),
    p(502, 554, 2187),
    p(66, 145, 2380),
    p(504, 568, 3385),
    p(464, 513, 2733),
    p(428, 497, 2931),
    p(178, 241, 3275),
    p(8, 37, 2587),
    p(302, 351, 2671),
    p(434, 521, 3235),
    p(434, 521, 3235),
    p(60, 127, 3445),
    p(348, 377, 3489),
    p(499, 586, 3565),
    p(68, 145, 3581),
    p(1296, 1360, 3385),
    p(1256, 1305, 2733),
    p(1220, 1289, 2931),
    p(970, 1033, 3275),
    p(800, 829, 2587),
    p(1094, 1143, 2671),
    p(1226, 1313, 3235),
    p(1226, 1313, 3235),
    p(852, 919, 3445),
    p(1140, 1169, 3489),
    p(1291, 1378, 3565),
    p(860, 937, 3581),
];
