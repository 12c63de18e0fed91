use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::output::OutputFormat;
use crate::request::{GenerationRequest, MaskMode, SubjectKind, REGION_CODES};
use crate::{Error, Result, DEFAULT_CONCURRENCY};

#[derive(Parser, Debug)]
#[command(name = "gerador")]
#[command(version, about = "Generates synthetic company or person records and inserts them into a database")]
pub struct Cli {
    /// Database hostname
    #[arg(long)]
    pub host: String,

    /// Database name
    #[arg(long)]
    pub database: String,

    /// Database user
    #[arg(long)]
    pub user: String,

    /// Database password
    #[arg(long, env = "GERADOR_DB_PASSWORD")]
    pub password: String,

    /// Destination table or collection; a name containing "empresa" generates
    /// companies, one containing "pessoa" generates people
    #[arg(long)]
    pub table: String,

    /// Region code of the generated subjects; defaults to a random federative
    /// unit
    #[arg(long)]
    pub state: Option<String>,

    /// Age of the generated subjects in years; defaults to a random value
    /// between 1 and 50
    #[arg(long)]
    pub age: Option<u32>,

    /// Whether generated identifiers keep their punctuation
    #[arg(long, value_enum, default_value_t = MaskMode::Masked)]
    pub mask: MaskMode,

    /// How records are written: relational row inserts or single-document
    /// inserts
    #[arg(long, value_enum, default_value_t = BackendKind::Relational)]
    pub backend: BackendKind,

    /// Also write the generated records to this .csv or .json file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Number of concurrent generation tasks in the batch
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Which persistence backend the sink writes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Relational,
    Document,
}

/// Connection parameters for the persistence backend.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// Optional file side channel next to the database writes.
#[derive(Debug, Clone)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
}

/// Everything one batch run needs, resolved from the CLI once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub db: DbConfig,
    pub destination: String,
    pub backend: BackendKind,
    pub request: GenerationRequest,
    pub output: Option<OutputTarget>,
    pub concurrency: usize,
}

/// Per-run state the components share instead of reaching for globals.
///
/// Holds the random source that fills in unspecified region and age, seeded
/// explicitly in tests so default resolution is deterministic.
#[derive(Debug)]
pub struct RunContext {
    rng: StdRng,
}

impl RunContext {
    pub fn from_entropy() -> Self {
        RunContext {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        RunContext {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick_region(&mut self) -> String {
        REGION_CODES[self.rng.gen_range(0..REGION_CODES.len())].to_string()
    }

    fn pick_age(&mut self) -> u32 {
        self.rng.gen_range(1..=50)
    }
}

/// Resolves the parsed CLI into a [`RunConfig`], drawing defaults from the
/// run context. Configuration errors here are terminal: nothing has run yet.
pub fn resolve(cli: Cli, ctx: &mut RunContext) -> Result<RunConfig> {
    let kind = subject_kind(&cli.table)?;

    let region = match cli.state {
        Some(state) => state.to_uppercase(),
        None => ctx.pick_region(),
    };
    let age = cli.age.unwrap_or_else(|| ctx.pick_age());

    let output = cli
        .output
        .map(|path| OutputFormat::from_path(&path).map(|format| OutputTarget { path, format }))
        .transpose()?;

    Ok(RunConfig {
        db: DbConfig {
            host: cli.host,
            database: cli.database,
            user: cli.user,
            password: cli.password,
        },
        destination: cli.table,
        backend: cli.backend,
        request: GenerationRequest {
            kind,
            region,
            age,
            mask: cli.mask,
        },
        output,
        concurrency: cli.concurrency,
    })
}

/// The destination name doubles as the mode switch: `empresa` tables receive
/// companies, `pessoa` tables receive people. Company wins when a name
/// somehow contains both.
fn subject_kind(destination: &str) -> Result<SubjectKind> {
    if destination.contains("empresa") {
        Ok(SubjectKind::Company)
    } else if destination.contains("pessoa") {
        Ok(SubjectKind::Person)
    } else {
        Err(Error::Config(format!(
            "destination {destination:?} selects no subject kind; \
             use a name containing \"empresa\" or \"pessoa\""
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli(table: &str) -> Cli {
        Cli {
            host: "localhost".into(),
            database: "testdb".into(),
            user: "tester".into(),
            password: "secret".into(),
            table: table.into(),
            state: None,
            age: None,
            mask: MaskMode::Masked,
            backend: BackendKind::Relational,
            output: None,
            concurrency: DEFAULT_CONCURRENCY,
            verbose: false,
        }
    }

    #[test]
    fn default_region_is_always_a_known_code() {
        for seed in 0..200 {
            let mut ctx = RunContext::with_seed(seed);
            let config = resolve(base_cli("empresa"), &mut ctx).unwrap();
            assert!(
                REGION_CODES.contains(&config.request.region.as_str()),
                "seed {seed} picked unknown region {}",
                config.request.region
            );
        }
    }

    #[test]
    fn default_age_stays_between_1_and_50() {
        for seed in 0..200 {
            let mut ctx = RunContext::with_seed(seed);
            let config = resolve(base_cli("pessoa"), &mut ctx).unwrap();
            assert!(
                (1..=50).contains(&config.request.age),
                "seed {seed} picked age {}",
                config.request.age
            );
        }
    }

    #[test]
    fn explicit_state_and_age_are_kept() {
        let mut cli = base_cli("empresa");
        cli.state = Some("sp".into());
        cli.age = Some(12);

        let mut ctx = RunContext::with_seed(0);
        let config = resolve(cli, &mut ctx).unwrap();
        assert_eq!(config.request.region, "SP");
        assert_eq!(config.request.age, 12);
    }

    #[test]
    fn destination_name_selects_the_subject_kind() {
        assert_eq!(subject_kind("empresa_teste").unwrap(), SubjectKind::Company);
        assert_eq!(subject_kind("dados_pessoa").unwrap(), SubjectKind::Person);
        // company wins on ambiguous names
        assert_eq!(
            subject_kind("empresa_pessoa").unwrap(),
            SubjectKind::Company
        );
        assert!(subject_kind("clientes").is_err());
    }

    #[test]
    fn output_extension_is_validated() {
        let mut cli = base_cli("empresa");
        cli.output = Some("records.csv".into());
        let mut ctx = RunContext::with_seed(0);
        let config = resolve(cli, &mut ctx).unwrap();
        assert_eq!(config.output.unwrap().format, OutputFormat::Csv);

        let mut cli = base_cli("empresa");
        cli.output = Some("records.xml".into());
        assert!(matches!(
            resolve(cli, &mut RunContext::with_seed(0)),
            Err(Error::Config(_))
        ));
    }
}
