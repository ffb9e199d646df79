pub mod exchange;
pub mod record;
pub mod series;
