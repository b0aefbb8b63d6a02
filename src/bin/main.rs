use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use job_lifecycle::{
    JobOperateApi, JobStatisticsApi, RegistryConfig, ServerStatisticsApi, ShardingStatisticsApi,
    SharedRegistry, connect, create_console, load_console_config,
};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "job-lifecycle")]
#[command(about = "Elastic job lifecycle console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Registry selection shared by every one-shot command.
#[derive(Args)]
struct Target {
    /// Tenant namespace; omit for the untenanted tree
    #[arg(long)]
    tenant: Option<String>,
    #[arg(long, env = "REGISTRY_URL", default_value = "memory")]
    db_url: String,
}

impl Target {
    async fn registry(&self) -> Result<SharedRegistry> {
        let config = RegistryConfig {
            url: self.db_url.clone(),
            ..Default::default()
        };
        info!("Using registry url: {}", config.url);
        connect(config).await
    }

    fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }
}

/// `(job?, server?)` selector of a fan-out mutation.
#[derive(Args)]
struct Selection {
    #[arg(long)]
    job: Option<String>,
    #[arg(long)]
    server: Option<String>,
    #[command(flatten)]
    target: Target,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the console REST server
    Serve {
        /// Overrides the bind address from the console config
        #[arg(long)]
        bind: Option<String>,
        /// Overrides the registry url from the console config
        #[arg(long)]
        db_url: Option<String>,
    },
    /// List every job with its status
    Jobs {
        #[command(flatten)]
        target: Target,
    },
    /// Show one job
    Job {
        job: String,
        #[command(flatten)]
        target: Target,
    },
    /// Show the sharding items of a job
    Sharding {
        job: String,
        #[command(flatten)]
        target: Target,
    },
    /// List servers, or the jobs of one server
    Servers {
        #[arg(long)]
        server: Option<String>,
        #[command(flatten)]
        target: Target,
    },
    /// Ask every instance of a job to run once
    Trigger {
        job: String,
        #[command(flatten)]
        target: Target,
    },
    /// Mark servers disabled
    Disable(Selection),
    /// Clear the disabled mark
    Enable(Selection),
    /// Ask instances to stop
    Shutdown(Selection),
    /// Delete server and instance registrations
    Remove(Selection),
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("job_lifecycle=info".parse()?)
                .add_directive("surrealdb=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, db_url } => {
            let mut config = load_console_config()?;
            if let Some(url) = db_url {
                config.registry.url = url;
            }
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            info!("Using registry url for console: {}", config.registry.url);

            let app = create_console(&config).await?;
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Console listening on http://{}", bind);
            axum::serve(listener, app).await?;
        }
        Commands::Jobs { target } => {
            let jobs = JobStatisticsApi::new(target.registry().await?);
            print_json(&jobs.get_all_jobs_brief_info(target.tenant()).await?)?;
        }
        Commands::Job { job, target } => {
            let jobs = JobStatisticsApi::new(target.registry().await?);
            match jobs.get_job_brief_info(&job, target.tenant()).await? {
                Some(info) => print_json(&info)?,
                None => println!("No job named '{}'.", job),
            }
        }
        Commands::Sharding { job, target } => {
            let sharding = ShardingStatisticsApi::new(target.registry().await?);
            print_json(&sharding.get_sharding_info(&job, target.tenant()).await?)?;
        }
        Commands::Servers { server, target } => {
            let registry = target.registry().await?;
            match server {
                Some(ip) => {
                    let jobs = JobStatisticsApi::new(registry);
                    print_json(&jobs.get_jobs_brief_info(&ip, target.tenant()).await?)?;
                }
                None => {
                    let servers = ServerStatisticsApi::new(registry);
                    print_json(&servers.get_all_servers_brief_info(target.tenant()).await?)?;
                }
            }
        }
        Commands::Trigger { job, target } => {
            let operator = JobOperateApi::new(target.registry().await?);
            let touched = operator.trigger(&job, target.tenant()).await?;
            println!("Triggered {} instance(s) of '{}'.", touched, job);
        }
        Commands::Disable(selection) => {
            let touched = run_operation(&selection, Operation::Disable).await?;
            println!("Disabled {} server node(s).", touched);
        }
        Commands::Enable(selection) => {
            let touched = run_operation(&selection, Operation::Enable).await?;
            println!("Enabled {} server node(s).", touched);
        }
        Commands::Shutdown(selection) => {
            let touched = run_operation(&selection, Operation::Shutdown).await?;
            println!("Asked {} instance(s) to shut down.", touched);
        }
        Commands::Remove(selection) => {
            let touched = run_operation(&selection, Operation::Remove).await?;
            println!("Removed {} server node(s).", touched);
        }
    }

    Ok(())
}

enum Operation {
    Disable,
    Enable,
    Shutdown,
    Remove,
}

async fn run_operation(selection: &Selection, operation: Operation) -> Result<usize> {
    let operator = JobOperateApi::new(selection.target.registry().await?);
    let job = selection.job.as_deref();
    let server = selection.server.as_deref();
    let tenant = selection.target.tenant();
    let touched = match operation {
        Operation::Disable => operator.disable(job, server, tenant).await?,
        Operation::Enable => operator.enable(job, server, tenant).await?,
        Operation::Shutdown => operator.shutdown(job, server, tenant).await?,
        Operation::Remove => operator.remove(job, server, tenant).await?,
    };
    Ok(touched)
}
