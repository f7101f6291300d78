use clap::{Parser, Subcommand};
use folio::compile::Compiler;
use folio::site::Site;
use folio::{config, output};
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Rule-driven content compiler")]
#[command(long_about = "\
Rule-driven content compiler

Items (pages and assets) are compiled into one or more representations,
each run through the filters and layout its rule names and written to a
path computed from the item's identifier and metadata.

Site structure:

  site/
  ├── config.toml              # Site config (optional)
  ├── Rules                    # Which reps each item gets and how they are built
  ├── content/                 # Pages, with optional TOML front matter
  │   ├── index.md             # → /            → /index.html
  │   └── blog/first-post.md   # → /blog/first-post/ → /blog/first-post/index.html
  ├── layouts/
  │   └── default.html         # → /default/
  └── assets/
      ├── style.css            # → /style/      → /assets/style.css
      └── style.toml           # Sidecar metadata for style.css

Rules:

  page '/blog/*' rep source    # Blog posts get a second rep...
  end                          # ...that copies the source through

  page '*'
    filter markdown
    layout '/default/'
  end

  asset '*'
  end

  layout '*' template

Run 'folio gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Site root directory
    #[arg(long, default_value = ".", global = true)]
    site: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every rep and write it to the output directory
    Compile,
    /// Load the site and rules and map every rep without writing anything
    Check,
    /// List every rep and the path it compiles to
    Routes {
        /// Print the route table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every file a compile would write
    Clean,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Compile => {
            let site = Site::load(&cli.site)?;
            let (tx, rx) = mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_compile_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = Compiler::new(&site).with_events(tx).run();
            printer.join().unwrap();
            output::print_summary(&result?);
        }
        Command::Check => {
            println!("==> Checking {}", cli.site.display());
            let site = Site::load(&cli.site)?;
            let mut compiler = Compiler::new(&site);
            compiler.prepare()?;
            println!(
                "==> {} items, {} layouts, {} reps",
                site.items.len(),
                site.layouts.len(),
                compiler.reps().len()
            );
        }
        Command::Routes { json } => {
            let site = Site::load(&cli.site)?;
            let mut compiler = Compiler::new(&site);
            compiler.prepare()?;
            let routes = compiler.routes();
            if json {
                println!("{}", serde_json::to_string_pretty(&routes)?);
            } else {
                output::print_routes(&routes);
            }
        }
        Command::Clean => {
            let site = Site::load(&cli.site)?;
            let report = Compiler::new(&site).clean()?;
            output::print_clean(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
