use core::num::NonZeroU64;
use std::borrow::Cow;

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use typenum::Unsigned as _;

use crate::{
    nonstandard::Phase,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        primitives::{Epoch, Slot, UnixSeconds},
    },
    preset::{Preset, PresetName},
};

/// Configuration variables customizable at runtime.
///
/// Field names match the output of `/eth/v1/config/spec`, so a node's configuration can be
/// deserialized directly. Unrecognized variables are ignored.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Genesis
    #[serde(with = "serde_utils::string_or_native")]
    pub min_genesis_time: UnixSeconds,

    // Forking
    #[serde(with = "serde_utils::string_or_native")]
    pub altair_fork_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub bellatrix_fork_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub capella_fork_epoch: Epoch,

    // Time parameters
    #[serde(with = "serde_utils::string_or_native")]
    pub seconds_per_slot: NonZeroU64,
}

impl Default for Config {
    fn default() -> Self {
        // A custom network that omits `CONFIG_NAME` must not be mistaken for mainnet.
        Self {
            config_name: Cow::Borrowed("default"),
            ..Self::mainnet()
        }
    }
}

impl Config {
    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            preset_base: PresetName::Mainnet,
            min_genesis_time: 1_606_824_000,
            altair_fork_epoch: 74240,
            bellatrix_fork_epoch: 144_896,
            capella_fork_epoch: 194_048,
            seconds_per_slot: nonzero!(12_u64),
        }
    }

    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,
            min_genesis_time: 1_578_009_600,
            altair_fork_epoch: FAR_FUTURE_EPOCH,
            bellatrix_fork_epoch: FAR_FUTURE_EPOCH,
            capella_fork_epoch: FAR_FUTURE_EPOCH,
            seconds_per_slot: nonzero!(6_u64),
        }
    }

    #[must_use]
    pub const fn fork_epoch(&self, phase: Phase) -> Epoch {
        match phase {
            Phase::Phase0 => 0,
            Phase::Altair => self.altair_fork_epoch,
            Phase::Bellatrix => self.bellatrix_fork_epoch,
            Phase::Capella => self.capella_fork_epoch,
        }
    }

    /// Returns the latest phase scheduled to be active at `slot`.
    #[must_use]
    pub fn phase_at_slot<P: Preset>(&self, slot: Slot) -> Phase {
        let epoch = slot / P::SlotsPerEpoch::U64;

        enum_iterator::reverse_all::<Phase>()
            .find(|phase| self.fork_epoch(*phase) <= epoch)
            .unwrap_or(Phase::Phase0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use crate::preset::{Mainnet, Minimal};

    use super::*;

    #[test_case(0, Phase::Phase0)]
    #[test_case(74_239 * 32 + 31, Phase::Phase0)]
    #[test_case(74_240 * 32, Phase::Altair)]
    #[test_case(144_896 * 32, Phase::Bellatrix)]
    #[test_case(194_048 * 32 + 5, Phase::Capella)]
    fn mainnet_phase_at_slot(slot: Slot, expected_phase: Phase) {
        assert_eq!(Config::mainnet().phase_at_slot::<Mainnet>(slot), expected_phase);
    }

    #[test]
    fn minimal_config_never_leaves_phase0() {
        assert_eq!(
            Config::minimal().phase_at_slot::<Minimal>(u64::MAX),
            Phase::Phase0,
        );
    }

    #[test]
    fn deserializes_node_spec_output() -> anyhow::Result<()> {
        let config = serde_json::from_value::<Config>(json!({
            "CONFIG_NAME": "holesky",
            "PRESET_BASE": "mainnet",
            "MIN_GENESIS_TIME": "1695902100",
            "ALTAIR_FORK_EPOCH": "0",
            "BELLATRIX_FORK_EPOCH": "0",
            "CAPELLA_FORK_EPOCH": "256",
            "SECONDS_PER_SLOT": "12",
            "DENEB_FORK_EPOCH": "29696",
            "MAX_EFFECTIVE_BALANCE": "32000000000",
        }))?;

        assert_eq!(config.config_name, "holesky");
        assert_eq!(config.capella_fork_epoch, 256);
        assert_eq!(config.seconds_per_slot.get(), 12);

        Ok(())
    }

    #[test]
    fn missing_config_name_is_not_mainnet() -> anyhow::Result<()> {
        let config = serde_json::from_value::<Config>(json!({}))?;

        assert_eq!(config.config_name, "default");
        assert_eq!(config.preset_base, PresetName::Mainnet);

        Ok(())
    }
}
