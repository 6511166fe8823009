// Gamma-ray packet sources: turn radioactive decay statistics into the
// initial packets of a Monte Carlo radiative-transfer run.
pub mod constants;
pub mod decay;
pub mod doppler;
pub mod error;
pub mod gamma_ray;
pub mod geometry;
pub mod ledger;
pub mod packet;
pub mod positronium;
pub mod radioactive;
pub mod rng;
pub mod settings;
pub mod source;
pub mod stats;
mod utilities;

pub use decay::{DecayRow, DecayTable, IsotopeCatalog, IsotopeShellCounts, RadiationType};
pub use doppler::{doppler_factor_3d, doppler_factor_3d_all_packets};
pub use error::{Result, SourceError};
pub use gamma_ray::GammaRayPacketSource;
pub use geometry::EjectaGrid;
pub use ledger::{DepositionLedger, PositronRow};
pub use packet::{GXPacket, GXPacketCollection, PacketStatus};
pub use positronium::{PositroniumBranch, PositroniumSampler};
pub use radioactive::RadioactivePacketSource;
pub use rng::PacketRng;
pub use settings::Settings;
pub use source::{GeneratedPackets, PacketSource};
pub use stats::LineSpectrum;
pub use utilities::{get_index, interpolate_linear};
