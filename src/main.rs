use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::{stdin, BufReader};

use reconscope::cli::{
    read_elements, AddArgs, AssetAction, Cli, Command, EditAction, ElementArgs, ListArgs,
    ProgramAction, UrlAction,
};
use reconscope::config::Config;
use reconscope::context::ProgramContext;
use reconscope::editor::ScopeEditor;
use reconscope::engine::AssetKind;
use reconscope::init::{init_store, load_cdn_filter, setup_logging};
use reconscope::inventory::{Inventory, Target};
use reconscope::pipeline::{AssetIngestPipeline, IngestOutcome};
use reconscope::programs::ProgramManager;
use reconscope::store::Store;

struct App {
    config: Config,
    store: Arc<dyn Store>,
    pipeline: AssetIngestPipeline,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config).await?;
    setup_logging(&config.logging);

    let (store, pipeline) = init_store(&config)?;
    let mut app = App {
        config,
        store,
        pipeline,
    };
    app.run(cli).await
}

impl App {
    async fn run(&mut self, cli: Cli) -> Result<()> {
        let programs = ProgramManager::new(self.store.clone());
        let inventory = Inventory::new(self.store.clone());
        let editor = ScopeEditor::new(self.store.clone());

        match cli.command {
            Command::New { program } => {
                programs
                    .create_and_select(&program, &mut self.config, &cli.config)
                    .await?
            }
            Command::Use { program } => {
                programs
                    .select(&program, &mut self.config, &cli.config)
                    .await?
            }
            Command::Disable { program } => programs.disable(&program).await?,
            Command::Enable { program } => programs.enable(&program).await?,
            Command::Programs { show_disabled } => print_all(&programs.list(show_disabled).await?),
            Command::Program {
                action: Some(ProgramAction::List { show_disabled }),
                ..
            } => print_all(&programs.list(show_disabled).await?),
            Command::Program { program, .. } => {
                let ctx = self.context(program.as_deref()).await?;
                println!("{}", ctx.program());
            }

            Command::Domains(list) => {
                let program = self.list_program(&list).await?;
                print_all(&inventory.domains(program.as_deref()).await?);
            }
            Command::Ips { list, filter_cdns } => {
                let program = self.list_program(&list).await?;
                let filter = if filter_cdns {
                    Some(load_cdn_filter(&self.config.ingest).await?)
                } else {
                    None
                };
                print_all(&inventory.ips(program.as_deref(), filter.as_ref()).await?);
            }
            Command::Urls { list, hostname } => {
                let urls = match hostname {
                    Some(hostname) => inventory.urls_by_hostname(&hostname).await?,
                    None => {
                        let program = self.list_program(&list).await?;
                        inventory.urls(program.as_deref()).await?
                    }
                };
                print_all(&urls);
            }
            Command::Scope(args) => {
                let ctx;
                let target = if args.list.all {
                    Target::All {
                        include_disabled: args.include_disabled,
                    }
                } else {
                    ctx = self.context(args.list.program.as_deref()).await?;
                    Target::Program(ctx.program())
                };
                let patterns = inventory
                    .resolve_scope(target, args.direction.into(), args.wildcard, args.top)
                    .await?;
                print_all(&patterns);
            }

            Command::Domain { action } => self.asset_action(AssetKind::Domain, action).await?,
            Command::Ip { action } => self.asset_action(AssetKind::Ip, action).await?,
            Command::Url { action } => match action {
                UrlAction::Add { args, hostname } => {
                    let (ctx, tokens) = self.element_input(&args.target).await?;
                    let outcome = self
                        .pipeline
                        .add_urls(
                            &tokens,
                            ctx.program(),
                            args.source.as_deref(),
                            hostname.as_deref(),
                        )
                        .await?;
                    print_outcome(&outcome, args.target.show_new);
                }
                UrlAction::Remove(args) => {
                    let (ctx, tokens) = self.element_input(&args).await?;
                    let removed = self.pipeline.remove_urls(&tokens, ctx.program()).await?;
                    print_changes("DELETED", &removed, args.show_new);
                }
            },

            Command::Inscope { action } => match action {
                EditAction::Add(args) => {
                    let (ctx, elements) = self.element_input(&args).await?;
                    let added = editor.add_inscope(ctx.program(), &elements).await?;
                    print_changes("NEW", &added, args.show_new);
                }
                EditAction::Remove(args) => {
                    let (ctx, elements) = self.element_input(&args).await?;
                    let removed = editor.remove_inscope(ctx.program(), &elements).await?;
                    print_changes("DELETED", &removed, args.show_new);
                }
            },
            Command::Outscope { action } => match action {
                EditAction::Add(args) => {
                    let (ctx, elements) = self.element_input(&args).await?;
                    let added = editor.add_outscope(ctx.program(), &elements).await?;
                    print_changes("NEW", &added, args.show_new);
                }
                EditAction::Remove(args) => {
                    let (ctx, elements) = self.element_input(&args).await?;
                    let removed = editor.remove_outscope(ctx.program(), &elements).await?;
                    print_changes("DELETED", &removed, args.show_new);
                }
            },
            Command::Blacklist { action } => match action {
                EditAction::Add(args) => {
                    let (ctx, elements) = self.element_input(&args).await?;
                    let added = editor.add_blacklist(ctx.program(), &elements).await?;
                    print_changes("NEW", &added, args.show_new);
                }
                EditAction::Remove(args) => {
                    let (ctx, elements) = self.element_input(&args).await?;
                    let removed = editor.remove_blacklist(ctx.program(), &elements).await?;
                    print_changes("DELETED", &removed, args.show_new);
                }
            },
        }
        Ok(())
    }

    async fn asset_action(&self, kind: AssetKind, action: AssetAction) -> Result<()> {
        match action {
            AssetAction::Add(AddArgs { target, source }) => {
                let (ctx, tokens) = self.element_input(&target).await?;
                let outcome = match kind {
                    AssetKind::Ip => {
                        self.pipeline
                            .add_ips(&tokens, ctx.program(), source.as_deref())
                            .await?
                    }
                    _ => {
                        self.pipeline
                            .add_domains(&tokens, ctx.program(), source.as_deref())
                            .await?
                    }
                };
                print_outcome(&outcome, target.show_new);
            }
            AssetAction::Remove(args) => {
                let (ctx, tokens) = self.element_input(&args).await?;
                let removed = match kind {
                    AssetKind::Ip => self.pipeline.remove_ips(&tokens, ctx.program()).await?,
                    _ => self.pipeline.remove_domains(&tokens, ctx.program()).await?,
                };
                print_changes("DELETED", &removed, args.show_new);
            }
            AssetAction::Update(args) => {
                let (ctx, tokens) = self.element_input(&args).await?;
                let updated = match kind {
                    AssetKind::Ip => self.pipeline.update_ips(&tokens, ctx.program()).await?,
                    _ => self.pipeline.update_domains(&tokens, ctx.program()).await?,
                };
                print_changes("UPDATED", &updated, args.show_new);
            }
        }
        Ok(())
    }

    async fn context(&self, explicit: Option<&str>) -> Result<ProgramContext> {
        let ctx =
            ProgramContext::resolve(explicit, self.config.program.as_deref(), &*self.store).await?;
        Ok(ctx)
    }

    /// `None` lists across every program.
    async fn list_program(&self, list: &ListArgs) -> Result<Option<String>> {
        if list.all {
            return Ok(None);
        }
        let ctx = self.context(list.program.as_deref()).await?;
        Ok(Some(ctx.program().to_string()))
    }

    /// Resolves the program before stdin is read, so a missing program fails
    /// without waiting on input.
    async fn element_input(&self, args: &ElementArgs) -> Result<(ProgramContext, Vec<String>)> {
        let ctx = self.context(args.program.as_deref()).await?;
        let elements = if args.reads_stdin() {
            read_elements(BufReader::new(stdin()))
                .await
                .context("Failed to read elements from stdin")?
        } else {
            args.elements.clone()
        };
        Ok((ctx, elements))
    }
}

fn print_all(items: &[String]) {
    for item in items {
        println!("{}", item);
    }
}

fn print_changes(label: &str, items: &[String], show: bool) {
    if show {
        for item in items {
            println!("[{}] {}", label, item);
        }
    }
}

fn print_outcome(outcome: &IngestOutcome, show: bool) {
    print_changes("NEW", &outcome.added, show);
    print_changes("UPDATED", &outcome.updated, show);
}
