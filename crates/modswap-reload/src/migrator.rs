//! Configuration migration
//!
//! Carries explicit values from the configuration the old instance used into
//! the definition the new instance built. Keys match on name and value type
//! full name; enum values are converted onto the new module's enum type.
//! A value that cannot be converted, or that the new key rejects, is skipped
//! and the new key keeps its default.

use tracing::{debug, info, warn};

use modswap_kernel::instance::ModInstance;
use modswap_kernel::schema::{ConfigValueError, ModConfigurationDefinition};

use crate::conversion::{ConversionError, convert};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Rejected(#[from] ConfigValueError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedKey {
    pub key: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Keys whose value was written into the new definition
    pub migrated: Vec<String>,
    /// Matching keys whose value could not be carried over
    pub skipped: Vec<SkippedKey>,
    /// Old keys holding a value that have no counterpart in the new definition
    pub unmatched: Vec<String>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct ConfigMigrator;

impl ConfigMigrator {
    /// Copy explicit values from `old` into matching keys of `new`
    pub fn migrate(
        old: &ModConfigurationDefinition,
        new: &mut ModConfigurationDefinition,
    ) -> MigrationReport {
        let mut report = MigrationReport::default();

        for old_key in old.keys() {
            let Some(value) = old_key.explicit_value() else {
                continue;
            };
            let Some(new_key) = new.keys_mut().iter_mut().find(|k| {
                k.name() == old_key.name()
                    && k.value_type().full_name() == old_key.value_type().full_name()
            }) else {
                debug!("Config key {} has no counterpart, dropping", old_key.name());
                report.unmatched.push(old_key.name().to_string());
                continue;
            };

            let result = convert(value, new_key.value_type())
                .map_err(SkipReason::from)
                .and_then(|converted| new_key.set(converted).map_err(SkipReason::from));

            match result {
                Ok(()) => {
                    debug!("Migrated config key {}", old_key.name());
                    report.migrated.push(old_key.name().to_string());
                }
                Err(reason) => {
                    warn!("Skipping config key {}: {}", old_key.name(), reason);
                    report.skipped.push(SkippedKey {
                        key: old_key.name().to_string(),
                        reason,
                    });
                }
            }
        }

        report
    }

    /// Hand the surviving configuration over to `new_instance`
    ///
    /// The original instance's configuration handle survives: its definition
    /// is replaced by the migrated new one and the same handle is installed on
    /// the new instance. Returns `None` when the new instance has no
    /// configuration.
    pub fn hand_off(original: &ModInstance, new_instance: &ModInstance) -> Option<MigrationReport> {
        let Some(fresh) = new_instance.raw_configuration() else {
            info!(
                "{} declares no configuration, skipping migration",
                new_instance.type_name()
            );
            return None;
        };

        let Some(carried) = original.raw_configuration() else {
            debug!(
                "{} had no configuration, adopting the new one",
                original.type_name()
            );
            original.set_configuration(Some(fresh));
            return Some(MigrationReport::default());
        };

        let mut definition = fresh.definition();
        let report = Self::migrate(&carried.definition(), &mut definition);
        carried.replace_definition(definition);
        new_instance.set_configuration(Some(carried));

        info!(
            "Migrated configuration of {}: {} carried, {} skipped, {} dropped",
            new_instance.type_name(),
            report.migrated.len(),
            report.skipped.len(),
            report.unmatched.len()
        );
        Some(report)
    }
}
