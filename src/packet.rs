use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::H_CGS_KEV;
use crate::error::{Result, SourceError};

/// Transport status of a gamma-ray packet.
///
/// Sources only create `InProcess` packets; the transport stage owns every
/// later transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum PacketStatus {
    BetaDecay = -1,
    ComptonScatter = 0,
    Photoabsorption = 1,
    PairCreation = 2,
    InProcess = 3,
    End = 4,
    Escaped = 5,
}

/// A single gamma-ray packet as created by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GXPacket {
    /// Position at decay (cm)
    pub location: Vector3<f64>,
    /// Unit propagation direction
    pub direction: Vector3<f64>,
    pub energy_rf: f64,
    pub energy_cmf: f64,
    pub nu_rf: f64,
    pub nu_cmf: f64,
    pub status: PacketStatus,
    pub shell: usize,
    /// Decay time since explosion (s)
    pub time_start: f64,
    /// Time step the decay was drawn from (weighted-draw source only)
    pub time_index: Option<usize>,
}

impl GXPacket {
    /// Photon energy in the co-moving frame (keV)
    pub fn photon_energy_cmf_kev(&self) -> f64 {
        self.nu_cmf * H_CGS_KEV
    }
}

/// Struct-of-arrays store of packets handed to transport.
///
/// Packets are appended whole, so index `i` of every array always describes
/// the same packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GXPacketCollection {
    pub locations: Vec<Vector3<f64>>,
    pub directions: Vec<Vector3<f64>>,
    pub energies_rf: Vec<f64>,
    pub energies_cmf: Vec<f64>,
    pub nus_rf: Vec<f64>,
    pub nus_cmf: Vec<f64>,
    pub statuses: Vec<PacketStatus>,
    pub shells: Vec<usize>,
    pub times: Vec<f64>,
    /// Present only when every packet carries a time step
    pub time_indices: Option<Vec<usize>>,
}

impl GXPacketCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            locations: Vec::with_capacity(capacity),
            directions: Vec::with_capacity(capacity),
            energies_rf: Vec::with_capacity(capacity),
            energies_cmf: Vec::with_capacity(capacity),
            nus_rf: Vec::with_capacity(capacity),
            nus_cmf: Vec::with_capacity(capacity),
            statuses: Vec::with_capacity(capacity),
            shells: Vec::with_capacity(capacity),
            times: Vec::with_capacity(capacity),
            time_indices: None,
        }
    }

    /// Collect packets of one kind, all with or all without time indices
    pub fn from_packets<I: IntoIterator<Item = GXPacket>>(packets: I) -> Result<Self> {
        let mut collection = GXPacketCollection::new();
        for packet in packets {
            collection.push(packet)?;
        }
        Ok(collection)
    }

    /// Append one packet to every array.
    ///
    /// The first packet decides whether the collection tracks time indices;
    /// a later packet of the other kind is refused and nothing is appended.
    pub fn push(&mut self, packet: GXPacket) -> Result<()> {
        if self.is_empty() {
            self.time_indices = packet.time_index.map(|_| Vec::new());
        }
        match (packet.time_index, &mut self.time_indices) {
            (Some(index), Some(indices)) => indices.push(index),
            (None, None) => {}
            _ => {
                return Err(SourceError::MixedTimeIndices {
                    packet: self.len(),
                })
            }
        }
        self.locations.push(packet.location);
        self.directions.push(packet.direction);
        self.energies_rf.push(packet.energy_rf);
        self.energies_cmf.push(packet.energy_cmf);
        self.nus_rf.push(packet.nu_rf);
        self.nus_cmf.push(packet.nu_cmf);
        self.statuses.push(packet.status);
        self.shells.push(packet.shell);
        self.times.push(packet.time_start);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Reassemble packet `i`
    pub fn get(&self, i: usize) -> Option<GXPacket> {
        if i >= self.len() {
            return None;
        }
        Some(GXPacket {
            location: self.locations[i],
            direction: self.directions[i],
            energy_rf: self.energies_rf[i],
            energy_cmf: self.energies_cmf[i],
            nu_rf: self.nus_rf[i],
            nu_cmf: self.nus_cmf[i],
            status: self.statuses[i],
            shell: self.shells[i],
            time_start: self.times[i],
            time_index: self.time_indices.as_ref().map(|indices| indices[i]),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = GXPacket> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Photon energy of packet `i` in the co-moving frame (keV)
    pub fn photon_energy_cmf_kev(&self, i: usize) -> f64 {
        self.nus_cmf[i] * H_CGS_KEV
    }
}
