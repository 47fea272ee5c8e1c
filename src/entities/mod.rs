// Entity Models
//
// Each entity is an active record: it owns its row's values in memory
// and persists itself through a `Database` session.

pub mod account;

pub use account::Account;
