pub(crate) mod deploy;
pub(crate) mod destroy;
pub(crate) mod routes;
pub(crate) mod status;
pub(crate) mod synth;
pub(crate) mod validate;
use clap::Subcommand;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Print CloudFormation templates, or write them to a directory
    Synth(synth::SynthCommand),

    /// Create or update stacks, storage first
    Deploy(deploy::DeployCommand),

    /// [DANGER] Delete stacks, including all data in the tables
    Destroy(destroy::DestroyCommand),

    /// Show the current status of every stack
    Status(status::StatusCommand),

    /// List the REST routes of the services
    Routes(routes::RoutesCommand),

    /// Check which handler a request would reach, validating its body
    Validate(validate::ValidateCommand),
}
