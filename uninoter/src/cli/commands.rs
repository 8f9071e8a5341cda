//! CLI command execution.
//!
//! Every command except `serve` is a thin client: it builds the view-model
//! for one screen over the HTTP service and the local store, runs a single
//! operation and prints the result.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

use crate::api::{HttpApi, RemoteService};
use crate::config::Config;
use crate::detail::{DetailView, Phase, TopicDetail};
use crate::invite::InviteForm;
use crate::models::Topic;
use crate::notify::{ConsoleNotifier, Notifier};
use crate::report::{NoOfflineReports, ReportSynthesizer, TemplateReport};
use crate::server;
use crate::session::SessionStore;
use crate::storage::{FileStore, LocalCache};
use crate::topics::TopicList;

use super::args::{Cli, Commands};

/// Shared pieces every client command needs.
struct Client {
    config: Config,
    cache: LocalCache,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
}

impl Client {
    fn open(config: Config) -> Result<Self> {
        let store = FileStore::open(&config.data_dir)?;
        let cache = LocalCache::new(Arc::new(store));
        let anonymous = HttpApi::new(&config.base_url, None, config.request_timeout)?;
        let session = SessionStore::hydrate(Arc::new(anonymous), cache.clone());
        debug!(
            base_url = %config.base_url,
            data_dir = %config.data_dir.display(),
            authenticated = session.is_authenticated(),
            "client ready"
        );
        Ok(Self {
            config,
            cache,
            session,
            notifier: Arc::new(ConsoleNotifier),
        })
    }

    /// The service client carrying the session token.
    fn remote(&self) -> Result<Arc<dyn RemoteService>> {
        let token = self.session.token().map(String::from);
        let api = HttpApi::new(&self.config.base_url, token, self.config.request_timeout)?;
        Ok(Arc::new(api))
    }

    /// Topic screens are only reachable when signed in.
    fn require_login(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not logged in. Run 'uninoter login' or 'uninoter signup' first.");
        }
        Ok(())
    }

    fn topic_list(&self) -> Result<TopicList> {
        self.require_login()?;
        Ok(TopicList::new(
            self.remote()?,
            self.cache.clone(),
            self.notifier.clone(),
            self.config.fallback,
        ))
    }

    /// Build the detail view-model and load `topic_id` into it.
    async fn topic_detail(&self, topic_id: &str) -> Result<TopicDetail> {
        self.require_login()?;
        let synthesizer: Arc<dyn ReportSynthesizer> = if self.config.offline_reports {
            Arc::new(TemplateReport)
        } else {
            Arc::new(NoOfflineReports)
        };
        let detail = TopicDetail::new(
            self.remote()?,
            self.cache.clone(),
            self.notifier.clone(),
            synthesizer,
            self.config.fallback,
        );
        if detail.load_topic(topic_id).await == Phase::NotFound {
            if detail.snapshot().await.load_failed {
                bail!("Could not load topic {topic_id} from {}", self.config.base_url);
            }
            bail!("Topic {topic_id} not found");
        }
        Ok(detail)
    }
}

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli, config: Config) -> Result<()> {
    let config = cli.apply(config);

    match cli.command {
        Commands::Serve { port, data_dir } => {
            let dir = data_dir.unwrap_or_else(|| config.data_dir.join("server"));
            server::start_server(port, Some(dir)).await
        }
        command => run_client(command, Client::open(config)?).await,
    }
}

async fn run_client(command: Commands, mut client: Client) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let user = client.session.login(&email, &password).await?;
            println!("✓ Logged in as {}", user.email);
        }
        Commands::Signup {
            email,
            password,
            name,
        } => {
            let user = client
                .session
                .signup(&email, &password, name.as_deref())
                .await?;
            println!("✓ Account created for {}", user.email);
        }
        Commands::Logout => {
            client.session.logout()?;
            println!("✓ Logged out");
        }
        Commands::Whoami => match client.session.user() {
            Some(user) => match &user.name {
                Some(name) => println!("{name} <{}>", user.email),
                None => println!("{}", user.email),
            },
            None => println!("Not logged in."),
        },
        Commands::Topics => {
            let mut list = client.topic_list()?;
            print_topics(list.fetch_topics().await?);
        }
        Commands::Create { title, description } => {
            let mut list = client.topic_list()?;
            let topic = list.create_topic(&title, description.as_deref()).await?;
            println!("ID: {}", topic.id);
        }
        Commands::Show { id } => {
            let detail = client.topic_detail(&id).await?;
            print_detail(&detail.snapshot().await);
        }
        Commands::Contribute { id, text } => {
            let detail = client.topic_detail(&id).await?;
            let text = text.join(" ");
            if let Some(contribution) = detail.submit_contribution(&text).await? {
                println!("ID: {}", contribution.id);
            }
        }
        Commands::Report { id } => {
            let detail = client.topic_detail(&id).await?;
            if let Some(summary) = detail.generate_report().await? {
                println!();
                println!("{}", summary.content);
            }
        }
        Commands::Invite { id, emails } => {
            client.require_login()?;
            let mut form = InviteForm::new(client.remote()?, client.notifier.clone(), id);
            for (index, email) in emails.into_iter().enumerate() {
                if index > 0 {
                    form.add_slot();
                }
                form.update_slot(index, email);
            }
            form.send_invites().await?;
        }
        Commands::Serve { .. } => bail!("'serve' runs the backend, not a client command"),
    }

    Ok(())
}

/// Cut `text` to at most `max` characters.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn print_topics(topics: &[Topic]) {
    if topics.is_empty() {
        println!("No topics yet. Create one with 'uninoter create <TITLE>'.");
        return;
    }

    println!("{:<38} {:<28} {:<12}", "ID", "TITLE", "CREATED");
    println!("{}", "-".repeat(80));
    for topic in topics {
        println!(
            "{:<38} {:<28} {:<12}",
            topic.id,
            clip(&topic.title, 26),
            topic.created_at.format("%Y-%m-%d")
        );
    }
}

fn print_detail(view: &DetailView) {
    let Some(topic) = &view.topic else {
        return;
    };

    println!("{}", topic.title);
    if let Some(description) = &topic.description {
        println!("{description}");
    }
    println!("Created: {}", topic.created_at.format("%Y-%m-%d %H:%M"));
    println!();

    match &view.summary {
        Some(summary) => {
            println!(
                "Report ({}, {}):",
                summary.origin,
                summary.generated_at.format("%Y-%m-%d %H:%M")
            );
            println!("{}", summary.content);
        }
        None => println!("No report yet. Run 'uninoter report {}'.", topic.id),
    }
    println!();

    if view.contributions.is_empty() {
        println!("No contributions yet.");
        return;
    }
    println!("Contributions ({}):", view.contributions.len());
    for contribution in &view.contributions {
        let author = contribution.contributor_email.as_deref().unwrap_or("anonymous");
        println!(
            "[{} {author}]:",
            contribution.created_at.format("%Y-%m-%d %H:%M")
        );
        println!("{}", contribution.content);
        println!();
    }
}
