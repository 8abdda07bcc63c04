use std::collections::HashMap;

use strum::{Display, IntoStaticStr};

use super::locations;

/// Location category, determining which memory region and bit test applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum Category {
    Underworld,
    Overworld,
    Npc,
    Misc,
}

/// Where a location lives in save data and how its satisfied bit is tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    /// Bitmask test against a room's 16-bit state word (underworld) or a
    /// flag byte (misc, where `room` is the save-data byte offset).
    Room { room: u16, mask: u16 },
    /// Flag-bit test against an overworld screen's save-data byte.
    Screen { screen: u16 },
    /// Bitmask test against the 16-bit NPC event word.
    Event { mask: u16 },
}

/// A single location joined with its server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: i64,
    pub name: &'static str,
    pub category: Category,
    pub coord: Coordinate,
}

impl Location {
    /// Room id this location is registered under, if any.
    fn room(&self) -> Option<u16> {
        match self.coord {
            Coordinate::Room { room, .. } => Some(room),
            _ => None,
        }
    }
}

/// Indexes over the joined location set for one session.
///
/// `build` is a pure function of the static tables and the server-provided
/// id-to-name map: the same input map always yields identical indexes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LocationTable {
    locations: Vec<Location>,
    by_id: HashMap<i64, usize>,
    by_room: HashMap<Category, HashMap<u16, Vec<usize>>>,
}

impl LocationTable {
    /// Join the static tables against the server's `{id -> name}` map.
    ///
    /// A static name with no matching server id is skipped: that location is
    /// unreachable this session, which is not an error.
    pub fn build(server_map: &HashMap<i64, String>) -> Self {
        let mut ids_by_name: HashMap<&str, i64> = HashMap::with_capacity(server_map.len());
        for (&id, name) in server_map {
            ids_by_name.insert(name.as_str(), id);
        }

        let mut table = LocationTable::default();

        for &(name, room, mask) in locations::UNDERWORLD {
            table.insert(&ids_by_name, name, Category::Underworld, Coordinate::Room { room, mask });
        }
        for &(name, screen) in locations::OVERWORLD {
            table.insert(&ids_by_name, name, Category::Overworld, Coordinate::Screen { screen });
        }
        for &(name, mask) in locations::NPC {
            table.insert(&ids_by_name, name, Category::Npc, Coordinate::Event { mask });
        }
        for &(name, room, mask) in locations::MISC {
            table.insert(&ids_by_name, name, Category::Misc, Coordinate::Room { room, mask });
        }

        table
    }

    fn insert(
        &mut self,
        ids_by_name: &HashMap<&str, i64>,
        name: &'static str,
        category: Category,
        coord: Coordinate,
    ) {
        let Some(&id) = ids_by_name.get(name) else {
            return;
        };

        let index = self.locations.len();
        self.locations.push(Location { id, name, category, coord });
        self.by_id.insert(id, index);

        if let Some(room) = self.locations[index].room() {
            self.by_room
                .entry(category)
                .or_default()
                .entry(room)
                .or_default()
                .push(index);
        }
    }

    pub fn get(&self, id: i64) -> Option<&Location> {
        self.by_id.get(&id).map(|&index| &self.locations[index])
    }

    /// All joined locations in a category.
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Location> {
        self.locations.iter().filter(move |loc| loc.category == category)
    }

    /// Locations registered under a room id within a category.
    pub fn in_room(&self, category: Category, room: u16) -> impl Iterator<Item = &Location> {
        self.by_room
            .get(&category)
            .and_then(|rooms| rooms.get(&room))
            .map(|indexes| indexes.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&index| &self.locations[index])
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_map(entries: &[(i64, &str)]) -> HashMap<i64, String> {
        entries.iter().map(|&(id, name)| (id, name.to_string())).collect()
    }

    #[test]
    fn test_build_joins_server_ids() {
        let map = server_map(&[
            (1001, "Blind's Hideout - Top"),
            (1002, "Flute Spot"),
            (1003, "Mushroom"),
            (1004, "Hobo"),
        ]);
        let table = LocationTable::build(&map);

        assert_eq!(table.len(), 4);

        let top = table.get(1001).unwrap();
        assert_eq!(top.category, Category::Underworld);
        assert_eq!(top.coord, Coordinate::Room { room: 0x11d, mask: 0x10 });

        let flute = table.get(1002).unwrap();
        assert_eq!(flute.coord, Coordinate::Screen { screen: 0x2a });

        let mushroom = table.get(1003).unwrap();
        assert_eq!(mushroom.coord, Coordinate::Event { mask: 0x1000 });

        let hobo = table.get(1004).unwrap();
        assert_eq!(hobo.category, Category::Misc);
        assert_eq!(hobo.coord, Coordinate::Room { room: 0x3c9, mask: 0x1 });
    }

    #[test]
    fn test_unknown_names_are_unreachable_not_errors() {
        let map = server_map(&[(1, "Some Other Game Location")]);
        let table = LocationTable::build(&map);
        assert!(table.is_empty());
    }

    #[test]
    fn test_room_index_groups_by_room() {
        let map = server_map(&[
            (1, "Blind's Hideout - Top"),
            (2, "Blind's Hideout - Left"),
            (3, "Sanctuary"),
        ]);
        let table = LocationTable::build(&map);

        let hideout: Vec<i64> = table
            .in_room(Category::Underworld, 0x11d)
            .map(|loc| loc.id)
            .collect();
        assert_eq!(hideout, vec![1, 2]);

        assert_eq!(table.in_room(Category::Underworld, 0x999).count(), 0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let map = server_map(&[
            (1, "Blind's Hideout - Top"),
            (2, "Flute Spot"),
            (3, "Mushroom"),
            (4, "Link's Uncle"),
            (5, "Sanctuary"),
        ]);
        let first = LocationTable::build(&map);
        let second = LocationTable::build(&map);
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_data_package_joins_every_table_entry() {
        let mut map = HashMap::new();
        let mut next_id = 59_000i64;
        for &(name, _, _) in locations::UNDERWORLD {
            map.insert(next_id, name.to_string());
            next_id += 1;
        }
        for &(name, _) in locations::OVERWORLD {
            map.insert(next_id, name.to_string());
            next_id += 1;
        }
        for &(name, _) in locations::NPC {
            map.insert(next_id, name.to_string());
            next_id += 1;
        }
        for &(name, _, _) in locations::MISC {
            map.insert(next_id, name.to_string());
            next_id += 1;
        }

        let table = LocationTable::build(&map);
        let expected = locations::UNDERWORLD.len()
            + locations::OVERWORLD.len()
            + locations::NPC.len()
            + locations::MISC.len();
        assert_eq!(table.len(), expected);
    }
}
