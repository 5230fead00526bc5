use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use hint_site::config::{self, CollectionConfig, SiteConfig};
use hint_site::{cards, index, output, prerender};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hint-site")]
#[command(about = "Content indexer and static prerenderer for the HINT site")]
#[command(long_about = "\
Content indexer and static prerenderer for the HINT site

Markdown collections are indexed into JSON for the client app, then every
entry gets its own prerendered HTML page so link previews work without
JavaScript.

Project structure:

  .
  ├── site.toml                          # Optional overrides (see gen-config)
  ├── src/content/blog/                  # Flat collection: one .md per post
  │   └── introducing-dotlanth.md
  ├── src/blogData.json                  # ← written by `index`
  ├── public/content/series/             # Nested collection: one dir per entry
  │   ├── the-qubit/
  │   │   ├── index.en.md
  │   │   └── index.tr.md
  │   └── index.json                     # ← written by `index`
  └── dist/
      ├── index.html                     # SPA shell (from the app build)
      └── blog/introducing-dotlanth/
          └── index.html                 # ← written by `prerender`

Frontmatter:
  ---
  title: Introducing Dotlanth
  date: 2024-03-01
  excerpt: Optional; defaults to the first 150 characters of the body
  ---

SVG share cards listed under [cards] are rasterized to 1200x630 PNG files
next to their sources, since link-preview scrapers do not render SVG.

Set RUST_LOG=debug for per-page image resolution details.
Run 'hint-site gen-config' to generate a documented site.toml.")]
#[command(version)]
struct Cli {
    /// Project root; configured paths are relative to it
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file [default: <root>/site.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Restrict to the named collection (repeatable)
    #[arg(long = "collection", global = true)]
    collections: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index markdown collections into JSON
    Index,
    /// Rasterize configured SVG share cards to PNG
    Cards,
    /// Prerender one HTML page per indexed entry
    Prerender,
    /// Run the full pipeline: index → cards → prerender
    Build,
    /// Index collections and validate the shell without writing anything
    Check,
    /// Print a stock site.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let now = Utc::now();

    match &cli.command {
        Command::Index => {
            let site = load_site(&cli)?;
            let collections = site.select_collections(&cli.collections)?;
            run_index(&cli.root, &site, &collections, now)?;
        }
        Command::Cards => {
            let site = load_site(&cli)?;
            init_thread_pool(&site.build);
            run_cards(&cli.root, &site)?;
        }
        Command::Prerender => {
            let site = load_site(&cli)?;
            let collections = site.select_collections(&cli.collections)?;
            init_thread_pool(&site.build);
            run_prerender(&cli.root, &site, &collections)?;
        }
        Command::Build => {
            let site = load_site(&cli)?;
            let collections = site.select_collections(&cli.collections)?;
            init_thread_pool(&site.build);
            println!("==> Stage 1: Indexing {}", cli.root.display());
            run_index(&cli.root, &site, &collections, now)?;
            if !site.cards.files.is_empty() {
                println!("==> Rendering share cards");
                run_cards(&cli.root, &site)?;
            }
            println!(
                "==> Stage 2: Prerendering → {}",
                site.dist_path(&cli.root).display()
            );
            run_prerender(&cli.root, &site, &collections)?;
            println!("==> Build complete");
        }
        Command::Check => {
            let site = load_site(&cli)?;
            let collections = site.select_collections(&cli.collections)?;
            println!("==> Checking {}", cli.root.display());
            for collection in &collections {
                let options = index::IndexOptions::from_config(&site, collection, now);
                let result =
                    index::index_collection(&collection.source_path(&cli.root), &options)?;
                output::print_index_output(
                    &collection.name,
                    &result,
                    Path::new(&collection.index),
                    &site.default_language,
                );
            }
            prerender::Shell::load(&site.template_path(&cli.root))?;
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `--config`, or `site.toml` under `--root`.
fn load_site(cli: &Cli) -> Result<SiteConfig, config::ConfigError> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join(config::CONFIG_FILE));
    config::load_config(&path)
}

fn run_index(
    root: &Path,
    site: &SiteConfig,
    collections: &[&CollectionConfig],
    now: DateTime<Utc>,
) -> Result<(), index::IndexError> {
    for collection in collections {
        let result = index::build_index(root, site, collection, now)?;
        info!(
            "Wrote {} ({} entries)",
            collection.index_path(root).display(),
            result.entries.len()
        );
        output::print_index_output(
            &collection.name,
            &result,
            Path::new(&collection.index),
            &site.default_language,
        );
    }
    Ok(())
}

fn run_cards(root: &Path, site: &SiteConfig) -> Result<(), cards::CardError> {
    let report = cards::render_cards(root, site)?;
    output::print_cards_output(&report, root);
    Ok(())
}

fn run_prerender(
    root: &Path,
    site: &SiteConfig,
    collections: &[&CollectionConfig],
) -> Result<(), prerender::PrerenderError> {
    let report = prerender::prerender(root, site, collections)?;
    output::print_prerender_output(&report, root);
    Ok(())
}

/// Initialize the rayon thread pool based on build config.
///
/// `max_threads` can lower the pool below the core count, never raise it.
fn init_thread_pool(build: &config::BuildConfig) {
    let threads = config::effective_threads(build);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
