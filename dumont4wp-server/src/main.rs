use clap::{parser::ValueSource, ArgMatches, CommandFactory, FromArgMatches, Parser};
use dumont4wp_http::serve;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7800";

#[derive(Parser)]
#[command(name = "dumont4wp", version, about = "Settings page for the Viglet Dumont search connector")]
struct Cli {
    #[arg(long, env = "DUMONT4WP_DATA_DIR", default_value = "./data")]
    data_dir: String,
    #[arg(long, env = "DUMONT4WP_BIND_ADDR")]
    bind_addr: Option<String>,
    #[arg(long, env = "DUMONT4WP_PORT")]
    port: Option<u16>,

    /// Bind to 127.0.0.1:0 (OS-assigned ephemeral port). Prints resolved address at startup.
    #[arg(long)]
    auto_port: bool,

    /// Site whose settings page is served.
    #[arg(long, env = "DUMONT4WP_SITE_ID", default_value = "main")]
    site_id: String,

    /// Store settings in the network scope shared by every site.
    #[arg(long, env = "DUMONT4WP_MULTISITE")]
    multisite: bool,

    #[arg(long, env = "DUMONT4WP_MAIN_SITE_ID", default_value = "main")]
    main_site_id: String,

    /// Comma separated content types offered for indexing.
    #[arg(long, env = "DUMONT4WP_CONTENT_TYPES", default_value = "page,post")]
    content_types: String,

    /// Directory holding `<type>.json` files for bulk loads. Defaults to `<data-dir>/content`.
    #[arg(long, env = "DUMONT4WP_CONTENT_DIR")]
    content_dir: Option<String>,

    /// Submitted form values arrive backslash-quoted by a fronting proxy; un-escape them.
    #[arg(long, env = "DUMONT4WP_MAGIC_QUOTES")]
    magic_quotes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cmd = Cli::command();
    let matches = cmd.get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let runtime = resolve_runtime_config(&cli, &matches)
        .map_err(|msg| std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))?;
    runtime.export();
    serve().await
}

#[derive(Debug, PartialEq, Eq)]
struct RuntimeConfig {
    data_dir: String,
    bind_addr: String,
    site_id: String,
    multisite: bool,
    main_site_id: String,
    content_types: String,
    content_dir: String,
    magic_quotes: bool,
}

impl RuntimeConfig {
    /// `serve()` reads its configuration from the environment.
    fn export(&self) {
        std::env::set_var("DUMONT4WP_DATA_DIR", &self.data_dir);
        std::env::set_var("DUMONT4WP_BIND_ADDR", &self.bind_addr);
        std::env::set_var("DUMONT4WP_SITE_ID", &self.site_id);
        std::env::set_var("DUMONT4WP_MULTISITE", if self.multisite { "1" } else { "0" });
        std::env::set_var("DUMONT4WP_MAIN_SITE_ID", &self.main_site_id);
        std::env::set_var("DUMONT4WP_CONTENT_TYPES", &self.content_types);
        std::env::set_var("DUMONT4WP_CONTENT_DIR", &self.content_dir);
        std::env::set_var(
            "DUMONT4WP_MAGIC_QUOTES",
            if self.magic_quotes { "1" } else { "0" },
        );
    }
}

fn resolve_runtime_config(cli: &Cli, matches: &ArgMatches) -> Result<RuntimeConfig, String> {
    validate_site_id("--site-id", &cli.site_id)?;
    validate_site_id("--main-site-id", &cli.main_site_id)?;
    let bind_addr = resolve_bind_addr(cli, matches)?;
    let content_dir = cli.content_dir.clone().unwrap_or_else(|| {
        std::path::Path::new(&cli.data_dir)
            .join("content")
            .to_string_lossy()
            .to_string()
    });
    Ok(RuntimeConfig {
        data_dir: cli.data_dir.clone(),
        bind_addr,
        site_id: cli.site_id.clone(),
        multisite: cli.multisite,
        main_site_id: cli.main_site_id.clone(),
        content_types: cli.content_types.clone(),
        content_dir,
        magic_quotes: cli.magic_quotes,
    })
}

fn resolve_bind_addr(cli: &Cli, matches: &ArgMatches) -> Result<String, String> {
    let on_command_line = |arg: &str| is_set_on_command_line(matches, arg);
    if cli.auto_port {
        if on_command_line("bind_addr") || on_command_line("port") {
            return Err("--auto-port cannot be combined with --bind-addr or --port".to_string());
        }
        return Ok("127.0.0.1:0".to_string());
    }

    // A flag beats an environment variable; between two of the same kind the
    // full address wins.
    let port_preferred = on_command_line("port") && !on_command_line("bind_addr");
    Ok(match (&cli.bind_addr, cli.port) {
        (Some(bind_addr), _) if !port_preferred => bind_addr.clone(),
        (_, Some(port)) => format!("127.0.0.1:{port}"),
        (Some(bind_addr), None) => bind_addr.clone(),
        (None, None) => DEFAULT_BIND_ADDR.to_string(),
    })
}

fn is_set_on_command_line(matches: &ArgMatches, arg: &str) -> bool {
    matches.value_source(arg) == Some(ValueSource::CommandLine)
}

fn validate_site_id(flag: &str, site_id: &str) -> Result<(), String> {
    if site_id.is_empty() {
        return Err(format!("{flag} cannot be empty"));
    }

    let valid = site_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(format!(
            "{flag} accepts only ASCII letters, numbers, '-' and '_'"
        ));
    }

    Ok(())
}
