//! Sensor channel configuration and particle kinematics.
//!
//! A sensor is described by an ordered list of energy bins; the relativistic
//! speed of the fastest particle each bin can hold is computed once at
//! construction and reused by the arrival-delay model. Channel identity is a
//! plain index into that list, carried alongside the energy metadata instead
//! of being encoded in column-name strings.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Speed of light, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// One astronomical unit, m.
pub const AU_M: f64 = 149_597_870_700.0;

/// MeV to Joule.
const MEV_TO_J: f64 = 1.60218e-13;

/// Particle species measured by a channel; selects the rest mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Particle {
    Electron,
    Ion,
}

impl Particle {
    /// Rest mass in kg (proton mass for ions).
    pub fn rest_mass_kg(&self) -> f64 {
        match self {
            Particle::Electron => 9.109_383_7015e-31,
            Particle::Ion => 1.672_621_92e-27,
        }
    }
}

/// Energy bin boundaries in MeV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyBin {
    pub lower_mev: f64,
    pub upper_mev: f64,
}

impl EnergyBin {
    pub fn new(lower_mev: f64, upper_mev: f64) -> Self {
        Self { lower_mev, upper_mev }
    }
}

/// Relativistic speed (m/s) of a particle with the given kinetic energy.
///
/// `v = c * sqrt(1 - (1 / (KE/(m*c^2) + 1))^2)`
pub fn relativistic_speed(kinetic_energy_mev: f64, particle: Particle) -> f64 {
    let ke_joule = kinetic_energy_mev * MEV_TO_J;
    let m = particle.rest_mass_kg();
    let rest_energy = m * SPEED_OF_LIGHT * SPEED_OF_LIGHT;
    let gamma_inv = 1.0 / (ke_joule / rest_energy + 1.0);
    SPEED_OF_LIGHT * (1.0 - gamma_inv * gamma_inv).sqrt()
}

/// Static per-sensor channel configuration.
///
/// Holds the ordered energy bins and the derived per-channel speed of the
/// fastest (upper-bound) particles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorChannels {
    sensor: String,
    particle: Particle,
    bins: Vec<EnergyBin>,
    speeds: Vec<f64>,
}

impl SensorChannels {
    /// Build a channel table, computing the per-channel speeds once.
    pub fn new(
        sensor: impl Into<String>,
        particle: Particle,
        bins: Vec<EnergyBin>,
    ) -> AnalysisResult<Self> {
        if bins.is_empty() {
            return Err(AnalysisError::DegenerateInput(
                "sensor needs at least one energy bin".into(),
            ));
        }
        let speeds = bins
            .iter()
            .map(|b| relativistic_speed(b.upper_mev, particle))
            .collect();
        Ok(Self {
            sensor: sensor.into(),
            particle,
            bins,
            speeds,
        })
    }

    /// EPT electron channels (34 bins).
    pub fn ept_electrons() -> Self {
        Self::new("ept", Particle::Electron, bins_from(EPT_ELECTRON_BINS))
            .expect("static bin table is non-empty")
    }

    /// EPT ion channels (64 bins).
    pub fn ept_ions() -> Self {
        Self::new("ept", Particle::Ion, bins_from(EPT_ION_BINS))
            .expect("static bin table is non-empty")
    }

    /// STEP electron channels. Early mission data has 32 channels, later
    /// data 48; anything else is not a STEP configuration.
    pub fn step_electrons(channel_count: usize) -> AnalysisResult<Self> {
        let table: &[(f64, f64)] = match channel_count {
            32 => STEP_BINS_32,
            48 => STEP_BINS_48,
            n => {
                return Err(AnalysisError::DegenerateInput(format!(
                    "STEP has 32 or 48 channels, not {}",
                    n
                )))
            }
        };
        Self::new("step", Particle::Electron, bins_from(table))
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn particle(&self) -> Particle {
        self.particle
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bin(&self, channel: usize) -> Option<&EnergyBin> {
        self.bins.get(channel)
    }

    /// Speed (m/s) of the fastest particles in a channel.
    pub fn speed(&self, channel: usize) -> Option<f64> {
        self.speeds.get(channel).copied()
    }

    pub fn speeds(&self) -> &[f64] {
        &self.speeds
    }
}

fn bins_from(table: &[(f64, f64)]) -> Vec<EnergyBin> {
    table
        .iter()
        .map(|&(lo, hi)| EnergyBin::new(lo, hi))
        .collect()
}

/// EPT electron energy bins, MeV.
const EPT_ELECTRON_BINS: &[(f64, f64)] = &[
    (0.0312, 0.0354), (0.0334, 0.0374), (0.0356, 0.0396), (0.0382, 0.0420),
    (0.0408, 0.0439), (0.0439, 0.0467), (0.0467, 0.0505), (0.0505, 0.0542),
    (0.0542, 0.0588), (0.0588, 0.0635), (0.0635, 0.0682), (0.0682, 0.0739),
    (0.0739, 0.0798), (0.0798, 0.0866), (0.0866, 0.0942), (0.0942, 0.1021),
    (0.1021, 0.1107), (0.1107, 0.1207), (0.1207, 0.1314), (0.1314, 0.1432),
    (0.1432, 0.1552), (0.1552, 0.1690), (0.1690, 0.1849), (0.1849, 0.2004),
    (0.2004, 0.2182), (0.2182, 0.2379), (0.2379, 0.2590), (0.2590, 0.2826),
    (0.2826, 0.3067), (0.3067, 0.3356), (0.3356, 0.3669), (0.3669, 0.3993),
    (0.3993, 0.4352), (0.4353, 0.4742),
];

/// EPT ion energy bins, MeV.
const EPT_ION_BINS: &[(f64, f64)] = &[
    (0.0495, 0.0574), (0.0520, 0.0602), (0.0552, 0.0627), (0.0578, 0.0651),
    (0.0608, 0.0678), (0.0645, 0.0718), (0.0689, 0.0758), (0.0729, 0.0798),
    (0.0768, 0.0834), (0.0809, 0.0870), (0.0870, 0.0913), (0.0913, 0.0974),
    (0.0974, 0.1034), (0.1034, 0.1096), (0.1096, 0.1173), (0.1173, 0.1246),
    (0.1246, 0.1333), (0.1333, 0.1419), (0.1419, 0.1514), (0.1514, 0.1628),
    (0.1628, 0.1744), (0.1744, 0.1879), (0.1879, 0.2033), (0.2033, 0.2189),
    (0.2189, 0.2364), (0.2364, 0.2549), (0.2549, 0.2744), (0.2744, 0.2980),
    (0.2980, 0.3216), (0.3216, 0.3494), (0.3494, 0.3810), (0.3810, 0.4117),
    (0.4117, 0.4472), (0.4472, 0.4850), (0.4850, 0.5255), (0.5255, 0.5734),
    (0.5734, 0.6216), (0.6216, 0.6767), (0.6767, 0.7401), (0.7401, 0.8037),
    (0.8037, 0.8752), (0.8752, 0.9500), (0.9500, 1.0342), (1.0342, 1.1294),
    (1.1294, 1.2258), (1.2258, 1.3376), (1.3376, 1.4641), (1.4641, 1.5934),
    (1.5934, 1.7372), (1.7372, 1.8867), (1.8867, 2.0537), (2.0537, 2.2479),
    (2.2479, 2.4375), (2.4375, 2.6602), (2.6602, 2.9209), (2.9209, 3.1725),
    (3.1725, 3.4609), (3.4609, 3.7620), (3.7620, 4.0993), (4.0993, 4.4821),
    (4.4821, 4.8701), (4.8701, 5.3147), (5.3147, 5.8322), (5.8322, 6.1316),
];

/// STEP energy bins for the early-mission 32-channel product, MeV.
const STEP_BINS_32: &[(f64, f64)] = &[
    (0.0057, 0.0090), (0.0061, 0.0091), (0.0065, 0.0094), (0.0070, 0.0098),
    (0.0075, 0.0102), (0.0082, 0.0108), (0.0088, 0.0114), (0.0095, 0.0121),
    (0.0103, 0.0129), (0.0111, 0.0137), (0.0120, 0.0146), (0.0130, 0.0157),
    (0.0141, 0.0168), (0.0152, 0.0180), (0.0166, 0.0193), (0.0179, 0.0206),
    (0.0193, 0.0221), (0.0209, 0.0237), (0.0226, 0.0254), (0.0245, 0.0274),
    (0.0265, 0.0295), (0.0287, 0.0317), (0.0310, 0.0341), (0.0335, 0.0366),
    (0.0362, 0.0394), (0.0394, 0.0425), (0.0425, 0.0459), (0.0459, 0.0498),
    (0.0498, 0.0539), (0.0539, 0.0583), (0.0583, 0.0629), (0.0629, 0.0680),
];

/// STEP energy bins for the 48-channel product, MeV.
const STEP_BINS_48: &[(f64, f64)] = &[
    (0.0057, 0.0090), (0.0060, 0.0091), (0.0062, 0.0092), (0.0065, 0.0094),
    (0.0069, 0.0096), (0.0071, 0.0098), (0.0074, 0.0101), (0.0078, 0.0105),
    (0.0083, 0.0109), (0.0086, 0.0112), (0.0097, 0.0128), (0.0115, 0.0141),
    (0.0122, 0.0148), (0.0127, 0.0153), (0.0135, 0.0163), (0.0143, 0.0171),
    (0.0149, 0.0177), (0.0159, 0.0186), (0.0169, 0.0195), (0.0176, 0.0202),
    (0.0186, 0.0213), (0.0198, 0.0224), (0.0209, 0.0237), (0.0223, 0.0248),
    (0.0231, 0.0257), (0.0245, 0.0274), (0.0262, 0.0288), (0.0272, 0.0298),
    (0.0287, 0.0317), (0.0306, 0.0332), (0.0318, 0.0344), (0.0335, 0.0366),
    (0.0358, 0.0384), (0.0377, 0.0411), (0.0404, 0.0431), (0.0420, 0.0447),
    (0.0440, 0.0478), (0.0473, 0.0502), (0.0494, 0.0522), (0.0518, 0.0560),
    (0.0556, 0.0586), (0.0579, 0.0609), (0.0605, 0.0655), (0.0651, 0.0683),
    (0.0680, 0.0738), (0.0736, 0.0771), (0.0767, 0.0802), (0.0799, 0.0865),
];
