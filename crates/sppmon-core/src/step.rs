//! Fixed installation sequence and its successor table.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A named stage in the installation sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Step {
    Welcome,
    SystemCheck,
    RuntimeSetup,
    DatastoreSetup,
    DashboardSetup,
    CredentialCollection,
    ConfigGeneration,
    SchedulingSetup,
    DashboardImport,
    Finished,
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("unknown installation step: {0:?}")]
pub struct StepParseError(pub String);

impl Step {
    /// Every step in execution order.
    pub const ALL: [Step; 10] = [
        Step::Welcome,
        Step::SystemCheck,
        Step::RuntimeSetup,
        Step::DatastoreSetup,
        Step::DashboardSetup,
        Step::CredentialCollection,
        Step::ConfigGeneration,
        Step::SchedulingSetup,
        Step::DashboardImport,
        Step::Finished,
    ];

    pub const FIRST: Step = Step::Welcome;

    /// Deterministic successor; `None` only for the terminal step.
    pub fn next(self) -> Option<Step> {
        match self {
            Step::Welcome => Some(Step::SystemCheck),
            Step::SystemCheck => Some(Step::RuntimeSetup),
            Step::RuntimeSetup => Some(Step::DatastoreSetup),
            Step::DatastoreSetup => Some(Step::DashboardSetup),
            Step::DashboardSetup => Some(Step::CredentialCollection),
            Step::CredentialCollection => Some(Step::ConfigGeneration),
            Step::ConfigGeneration => Some(Step::SchedulingSetup),
            Step::SchedulingSetup => Some(Step::DashboardImport),
            Step::DashboardImport => Some(Step::Finished),
            Step::Finished => None,
        }
    }

    /// Identifier stored in the state file.
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Welcome => "WELCOME",
            Step::SystemCheck => "SYSTEM_CHECK",
            Step::RuntimeSetup => "RUNTIME_SETUP",
            Step::DatastoreSetup => "DATASTORE_SETUP",
            Step::DashboardSetup => "DASHBOARD_SETUP",
            Step::CredentialCollection => "CREDENTIAL_COLLECTION",
            Step::ConfigGeneration => "CONFIG_GENERATION",
            Step::SchedulingSetup => "SCHEDULING_SETUP",
            Step::DashboardImport => "DASHBOARD_IMPORT",
            Step::Finished => "FINISHED",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Welcome => "Welcome",
            Step::SystemCheck => "System check",
            Step::RuntimeSetup => "Python runtime",
            Step::DatastoreSetup => "InfluxDB installation",
            Step::DashboardSetup => "Grafana installation",
            Step::CredentialCollection => "InfluxDB admin credentials",
            Step::ConfigGeneration => "Server configuration files",
            Step::SchedulingSetup => "Crontab configuration",
            Step::DashboardImport => "Dashboard import",
            Step::Finished => "Finish",
        }
    }

    /// Question asked at the checkpoint before entering this step.
    ///
    /// `None` for the first step, which is only entered on a fresh start.
    pub fn checkpoint_prompt(self) -> Option<&'static str> {
        let prompt = match self {
            Step::Welcome => return None,
            Step::SystemCheck => "Continue with the system check?",
            Step::RuntimeSetup => "Continue with the Python installation?",
            Step::DatastoreSetup => "Continue with InfluxDB installation?",
            Step::DashboardSetup => "Continue with Grafana installation?",
            Step::CredentialCollection => "Continue with the InfluxDB admin user setup?",
            Step::ConfigGeneration => "Continue with the creation of server config files?",
            Step::SchedulingSetup => "Continue with the crontab configuration?",
            Step::DashboardImport => "Continue with the Grafana dashboard import?",
            Step::Finished => "Finish the installation?",
        };
        Some(prompt)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = StepParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.as_str() == value)
            .ok_or_else(|| StepParseError(value.to_string()))
    }
}
