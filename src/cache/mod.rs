pub mod account;

pub use account::AccountCache;
