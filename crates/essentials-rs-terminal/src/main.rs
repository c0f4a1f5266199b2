use std::io::Write;

use essentials_rs_core::metadb::ManifestState;
use essentials_rs_core::progress::{CancelFlag, LogProgress};
use essentials_rs_core::{ReqwestFetcher, Session};

#[tokio::main]
async fn main() {
	let mut opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		opts = getopts::Options::new();
		opts.optflag( "h", "help",    "Show help");
		opts.optflag( "v", "verbose", "Increased verbosity");
		opts.optopt(  "o", "owner",   "Catalog owner to list repositories of", "OWNER");
		opts.optopt(  "f", "filter",  "Only consider repositories whose name contains FILTER", "FILTER");
		opts.optflag( "a", "all",     "Select every repository passing the filter");
		opts.optflag( "y", "yes",     "Install without asking for confirmation");
		opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

		let parsed_options = match opts.parse(&args[1..]) {
			Ok(m)  => { m }
			Err(e) => { println!("Unable to parse options: {}", e); return }
		};

		if parsed_options.opt_present("h") || parsed_options.free.is_empty() {
			eprintln!("{}", opts.usage("Usage: essentials-rs [options] list | resolve <repo>... | install <project-dir> <repo>..."));
			return;
		}

		parsed_options
	};

	let level = if parsed_options.opt_present("v") { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

	let mut config = essentials_rs_core::Config::load_from_disk().unwrap_or_else(|e| {
		log::warn!("Failed to read config file: {}", e);
		log::warn!("Using default config.");
		essentials_rs_core::Config::default()
	});
	if let Some(owner) = parsed_options.opt_str("o") {
		config.set_catalog_owner(owner);
	}

	let fetcher = match ReqwestFetcher::new(&config) {
		Ok(f) => f,
		Err(e) => { log::error!("Failed to create HTTP client: {}", e); return },
	};

	let cancel = CancelFlag::default();
	{
		let cancel = cancel.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				log::warn!("Interrupted, stopping after the current request.");
				cancel.cancel();
			}
		});
	}

	let mut session = Session::new(config, fetcher);
	match session.refresh_catalog().await {
		Ok(count) => log::debug!("Catalog lists {} packages.", count),
		Err(e) => { log::error!("Failed to list packages: {}", e); return },
	}
	if let Some(filter) = parsed_options.opt_str("f") {
		session.set_filter(&filter);
	}

	let result = match parsed_options.free[0].as_str() {
		"list" => list_packages(&mut session, cancel).await,
		"resolve" => {
			select_packages(&mut session, &parsed_options.free[1..], parsed_options.opt_present("a"));
			resolve(&mut session, cancel).await
		},
		"install" => {
			match parsed_options.free.get(1) {
				Some(project_dir) => {
					select_packages(&mut session, &parsed_options.free[2..], parsed_options.opt_present("a"));
					install_packages(&mut session, project_dir, parsed_options.opt_present("y"), cancel).await
				},
				None => Err(Error::MissingArgument),
			}
		},
		other => Err(Error::UnknownCommand(other.to_string())),
	};

	if let Err(e) = result {
		log::error!("{}", e);
		std::process::exit(1);
	}
}

/// Prints every visible repository with what its manifest declares.
async fn list_packages(session: &mut Session<ReqwestFetcher>, cancel: CancelFlag) -> Result<(), Error> {
	session.index_all(&mut LogProgress::new("Indexed", cancel)).await?;

	for name in session.selection().visible_names() {
		match session.manifest_state(&name) {
			ManifestState::Indexed(meta) => {
				println!("{} ({})", name, meta.identifier);
				for dependency in &meta.dependencies {
					println!("\t{}", dependency);
				}
			},
			ManifestState::Unavailable(e) => println!("{} [skipped: {}]", name, e),
			ManifestState::NotAttempted => println!("{}", name),
		}
	}
	Ok(())
}

/// Marks `names` as chosen, plus every visible repository when `all` is set.
fn select_packages(session: &mut Session<ReqwestFetcher>, names: &[String], all: bool) {
	if all {
		session.select_all_visible();
	}
	for name in names {
		if !session.set_selected(name, true) {
			log::warn!("Unknown package {}, ignoring.", name);
		}
	}
}

/// Indexes the selection and prints the user selected and forced packages.
async fn resolve(session: &mut Session<ReqwestFetcher>, cancel: CancelFlag) -> Result<(), Error> {
	session.index_effective(&mut LogProgress::new("Indexed", cancel)).await?;

	let snapshot = session.snapshot();
	let sources = session.forced_sources();

	println!("Selected packages:");
	for (name, _) in snapshot.visible.iter().zip(&snapshot.user_selected).filter(|(_, selected)| **selected) {
		println!("\t{}", name);
	}
	println!("Required dependencies:");
	for name in &snapshot.forced {
		match sources.get(name) {
			Some(source) => println!("\t{} (required by {})", name, source),
			None => println!("\t{}", name),
		}
	}
	Ok(())
}

async fn install_packages(session: &mut Session<ReqwestFetcher>, project_dir: &str, assume_yes: bool, cancel: CancelFlag) -> Result<(), Error> {
	let mut installer = essentials_rs_core::installation::ProjectManifestInstaller::new(project_dir)
		.map_err(essentials_rs_core::Error::from)?;

	resolve(session, cancel.clone()).await?;
	if session.effective_selection().is_empty() {
		println!("Nothing selected.");
		return Ok(());
	}

	if !assume_yes {
		print!("Proceed? [(y)/n] ");
		let _ = std::io::stdout().flush();
		confirm(&mut std::io::stdin().lock())?;
	}

	let summary = session.install(&mut installer, &mut LogProgress::new("Installed", cancel)).await;
	println!("{}", summary);

	if summary.failed > 0 {
		return Err(Error::InstallFailed(summary.failed));
	}
	Ok(())
}

/// Reads answers until a yes or a no. An empty line is a yes; end of input or a
/// read error is a no.
fn confirm(input: &mut impl std::io::BufRead) -> Result<(), Error> {
	loop {
		let mut line = String::new();
		match input.read_line(&mut line) {
			Ok(0) | Err(_) => return Err(Error::UserCancelled),
			Ok(_) => {},
		}
		let answer = line.trim().to_lowercase();
		if answer == "y" || answer.is_empty() {
			return Ok(());
		} else if answer == "n" {
			return Err(Error::UserCancelled);
		} else {
			println!("\nInput invalid.")
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("essentials-rs error: {0}")]
	CoreError(#[from] essentials_rs_core::Error),
	#[error("Missing argument")]
	MissingArgument,
	#[error("Unknown command {0}")]
	UnknownCommand(String),
	#[error("{0} packages failed to install")]
	InstallFailed(usize),
	#[error("User cancelled an action")]
	UserCancelled,
}
