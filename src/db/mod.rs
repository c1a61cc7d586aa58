// SPDX-License-Identifier: MIT

//! Database layer (hierarchical key-value store + typed record façade).

pub mod firebase;
pub mod memory;
pub mod records;
pub mod store;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use records::PlaylistRecordStore;
pub use store::KeyValueStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PLAYLISTS: &str = "playlists";
}
