pub mod constants;
pub mod density;
pub mod energy;
pub mod frequency;
pub mod length;
pub mod temperature;
pub mod time;


pub use density::Density;
pub use energy::Energy;
pub use frequency::Frequency;
pub use length::Length;
pub use temperature::Temperature;
pub use time::Time;
