pub mod audit;
pub mod config;
pub mod export;
pub mod ledger;
pub mod normalize;
pub mod paths;
pub mod record;
pub mod retention;
pub mod service;
pub mod util;
pub mod warn;
