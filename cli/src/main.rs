use bumpalo::Bump;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ilchain::{
    BranchEncoding, CompilationOptions, CompiledGuard, Error, ExecutionOptions, HostMethods,
    MethodSignature, render_error,
};
use miette::Result;
use tracing::debug;

/// ilchain - compile boolean guards into short-circuit stack-machine code
#[derive(Parser, Debug)]
#[command(name = "ilchain")]
#[command(about = "Compile, disassemble and run guards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    compile: CompileArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the listing of the compiled guard predicate
    Disasm {
        guard: String,

        /// Comma-separated parameter types, e.g. `i32,i32`
        #[arg(long, default_value = "")]
        params: String,
    },

    /// Compile the guard and evaluate it against the given arguments
    Run {
        guard: String,

        #[arg(long, default_value = "")]
        params: String,

        /// Comma-separated argument values, one per parameter
        #[arg(long, default_value = "")]
        args: String,

        /// Abort after this many executed instructions
        #[arg(long)]
        max_steps: Option<usize>,
    },

    /// Only check that the guard compiles
    Check {
        guard: String,

        #[arg(long, default_value = "")]
        params: String,
    },
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Branch encoding for conditional jumps
    #[arg(long, value_enum, default_value_t = Encoding::Auto, global = true)]
    branches: Encoding,

    /// Maximum nesting depth of the guard tree
    #[arg(long, default_value_t = 256, global = true)]
    max_depth: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Encoding {
    Auto,
    Short,
    Long,
}

impl From<Encoding> for BranchEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Auto => BranchEncoding::Auto,
            Encoding::Short => BranchEncoding::Short,
            Encoding::Long => BranchEncoding::Long,
        }
    }
}

impl CompileArgs {
    fn options(&self) -> CompilationOptions {
        CompilationOptions {
            branch_encoding: self.branches.into(),
            max_depth: self.max_depth,
        }
    }
}

fn compile<'a>(
    arena: &'a Bump,
    guard: &str,
    params: &str,
    options: CompilationOptions,
) -> Result<CompiledGuard<'a>, Error> {
    let params = MethodSignature::parse_params(params)?;
    debug!(%guard, ?params, ?options, "Compiling");
    ilchain::compile_guard(arena, guard, &params, options)
}

fn execute(cli: &Cli) -> Result<(), Error> {
    let arena = Bump::new();
    let options = cli.compile.options();
    match &cli.command {
        Command::Disasm { guard, params } => {
            let compiled = compile(&arena, guard, params, options)?;
            println!("{:?}", compiled.code());
        }
        Command::Run {
            guard,
            params,
            args,
            max_steps,
        } => {
            let compiled = compile(&arena, guard, params, options)?
                .with_execution_options(ExecutionOptions {
                    max_steps: *max_steps,
                });
            let texts: Vec<&str> = args
                .split(',')
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .collect();
            let values = compiled.parse_args(&texts)?;
            let taken = compiled.run(&HostMethods::new(), &values)?;
            println!("{}", taken);
        }
        Command::Check { guard, params } => {
            let compiled = compile(&arena, guard, params, options)?;
            let code = compiled.code();
            println!(
                "ok: {} instructions, {} bytes, max stack {}",
                code.instructions.len(),
                code.code_size(),
                code.max_stack_size
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use RUST_LOG to control log level, default to WARN if not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match execute(&cli) {
        Ok(()) => Ok(()),
        Err(err @ Error::Parse { .. }) => {
            render_error(&err);
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}
