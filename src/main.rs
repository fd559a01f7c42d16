// src/main.rs

//! jobfeed CLI.
//!
//! Thin presentation layer over the library: searches print as cards, all
//! state changes go through the user store, and `watch` runs the periodic
//! digest sweep in the foreground.

use clap::{Parser, Subcommand, ValueEnum};

use jobfeed::digest::{DigestScheduler, LogNotifier};
use jobfeed::error::Result;
use jobfeed::models::{Config, FilterSet, Frequency, JobRecord};
use jobfeed::pipeline::{PageOutcome, PostFilters, SearchSession, SortOrder};
use jobfeed::services::{FxClient, HttpJobSearch};
use jobfeed::store::UserStore;

#[derive(Parser, Debug)]
#[command(
    name = "jobfeed",
    version = "0.1.0",
    about = "Aggregated job search with saved searches and digests"
)]
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    /// User id the command acts on
    #[arg(short, long, global = true, default_value_t = 1)]
    user: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Salary,
    Date,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FrequencyArg {
    Off,
    Daily,
    Every3Days,
    Weekly,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Off => Frequency::Off,
            FrequencyArg::Daily => Frequency::Daily,
            FrequencyArg::Every3Days => Frequency::Every3Days,
            FrequencyArg::Weekly => Frequency::Weekly,
        }
    }
}

/// CLI Commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Run a search and show one page of results
    Search {
        /// Search terms
        keywords: Option<String>,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(long)]
        job_type: Option<String>,
        /// true = remote only, false = on-site only
        #[arg(long)]
        remote: Option<bool>,
        /// Only postings newer than this many hours
        #[arg(long)]
        hours: Option<u32>,
        #[arg(long)]
        distance: Option<u32>,
        /// 1-based page to show
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        sort: Option<SortArg>,
        /// Minimum annual salary
        #[arg(long)]
        min_salary: Option<i64>,
        /// Required salary currency
        #[arg(long)]
        currency: Option<String>,
        /// Only show these companies (repeatable)
        #[arg(long = "company")]
        companies: Vec<String>,
        /// Query only these sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Save the search under this name
        #[arg(long)]
        save: Option<String>,
    },
    /// Bookmark a job from the last results by its number
    Favorite {
        index: usize,
    },
    /// List favorites
    Favorites,
    /// Clear favorites
    FavoritesClear,
    /// List saved searches
    Saved,
    /// Configure a saved search's subscription
    Subscribe {
        name: String,
        #[arg(long)]
        freq: Option<FrequencyArg>,
        #[arg(long)]
        pause: bool,
        #[arg(long)]
        resume: bool,
    },
    /// Hide a company from results
    Mute {
        company: String,
    },
    /// Stop hiding a company
    Unmute {
        company: String,
    },
    /// Show cached exchange rates, refreshing when stale
    Rates,
    /// Print the full user record as JSON
    Export,
    /// Remove all data stored for the user
    DeleteUser,
    /// Run one digest sweep now
    Digest,
    /// Run the periodic digest scheduler in the foreground
    Watch,
}

fn print_card(n: usize, job: &JobRecord) {
    println!("{n}. {} — {} • {}", job.title, job.company, job.location);
    println!("   {} | {}", job.site, job.date_posted);
    println!("   {} | {}", job.remote_label(), job.job_type);
    println!("   {}", job.salary);
    if !job.description.is_empty() {
        println!("   {}", job.description);
    }
    let link = if job.url_raw.is_empty() { &job.url } else { &job.url_raw };
    if !link.is_empty() {
        println!("   {link}");
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_search(
    config: &Config,
    store: &UserStore,
    uid: u64,
    filters: FilterSet,
    post: PostFilters,
    sort: Option<SortArg>,
    page: usize,
    save: Option<String>,
) -> Result<()> {
    let client = HttpJobSearch::new(&config.scraper)?;
    let user = store.get(uid)?;

    let mut session = match SearchSession::open(
        &client,
        filters.clone(),
        &user.sources,
        &user.country,
        config.scraper.results_wanted,
        &config.search,
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            // Upstream failure ends here: an empty outcome plus the reason.
            println!("No results. Try again later. ({e})");
            return Ok(());
        }
    };

    session.set_post_filters(post);
    match sort {
        Some(SortArg::Salary) => session.sort(SortOrder::Salary),
        Some(SortArg::Date) => session.sort(SortOrder::Date),
        None => {}
    }

    let outcome = session
        .page(&client, &user.sources, &user.country, &user.muted_companies, page)
        .await;

    match outcome {
        PageOutcome::NoResults => {
            if session.is_empty() {
                println!("No results. Try different keywords or sources.");
            } else {
                println!("No results match the active filters.");
            }
        }
        PageOutcome::Window {
            jobs,
            page,
            total,
            has_more,
        } => {
            let start = (page - 1) * config.search.page_size;
            for (offset, job) in jobs.iter().enumerate() {
                print_card(start + offset + 1, job);
            }
            println!("page {page} • {total} results{}", if has_more { " • more available" } else { "" });
        }
    }

    store.save_last_results(uid, session.rows().to_vec())?;
    if let Some(name) = save {
        store.save_search(uid, &name, filters)?;
        println!("Saved search '{name}'.");
    }
    Ok(())
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config);
    config.validate()?;
    let store = UserStore::from_config(&config.store);
    let uid = cli.user;

    match cli.command {
        Command::Search {
            keywords,
            location,
            job_type,
            remote,
            hours,
            distance,
            page,
            sort,
            min_salary,
            currency,
            companies,
            sources,
            save,
        } => {
            let filters = FilterSet {
                keywords,
                location,
                job_type,
                remote,
                hours_old: hours,
                distance,
                sources: if sources.is_empty() { None } else { Some(sources) },
                country: None,
            };
            let post = PostFilters {
                min_salary_annual: min_salary,
                currency,
                include_companies: companies,
            };
            run_search(&config, &store, uid, filters, post, sort, page, save).await?;
        }
        Command::Favorite { index } => {
            let last = store.get_last_results(uid)?;
            match last.get(index.saturating_sub(1)) {
                Some(job) => {
                    if store.save_favorite(uid, job.clone())? {
                        println!("Added to favorites.");
                    } else {
                        println!("Already in favorites.");
                    }
                }
                None => println!("No result #{index} in the last search."),
            }
        }
        Command::Favorites => {
            let favorites = store.list_favorites(uid)?;
            if favorites.is_empty() {
                println!("No favorites yet.");
            }
            for (n, job) in favorites.iter().enumerate() {
                print_card(n + 1, job);
            }
        }
        Command::FavoritesClear => {
            store.clear_favorites(uid)?;
            println!("Favorites cleared.");
        }
        Command::Saved => {
            let searches = store.list_saved_searches(uid)?;
            if searches.is_empty() {
                println!("No saved searches.");
            }
            for search in &searches {
                let sub = &search.subscription;
                println!(
                    "{} — {:?}{}",
                    search.name,
                    sub.frequency,
                    if sub.paused { " (paused)" } else { "" }
                );
            }
        }
        Command::Subscribe {
            name,
            freq,
            pause,
            resume,
        } => {
            let searches = store.list_saved_searches(uid)?;
            match searches.iter().position(|s| s.name == name) {
                Some(idx) => {
                    store.update_saved_search(uid, idx, |s| {
                        if let Some(freq) = freq {
                            s.subscription.frequency = freq.into();
                        }
                        if pause {
                            s.subscription.paused = true;
                        }
                        if resume {
                            s.subscription.paused = false;
                        }
                    })?;
                    println!("Subscription updated for '{name}'.");
                }
                None => println!("No saved search named '{name}'."),
            }
        }
        Command::Mute { company } => {
            store.mutate(uid, |u| u.mute_company(&company))?;
            println!("Muted '{company}'.");
        }
        Command::Unmute { company } => {
            store.mutate(uid, |u| u.unmute_company(&company))?;
            println!("Unmuted '{company}'.");
        }
        Command::Rates => {
            let fx = FxClient::new(&config.fx)?;
            let mut user = store.get(uid)?;
            let rates = fx.ensure_rates(&mut user).await;
            // The fetch happened outside the lock; persist its outcome now.
            store.mutate(uid, |u| {
                u.fx_rates = user.fx_rates.clone();
                u.fx_ts = user.fx_ts;
                u.fx_error = user.fx_error.clone();
            })?;
            println!("{} rates vs {}", rates.len(), user.base_currency);
            if let Some(reason) = &user.fx_error {
                println!("last refresh failed: {reason}");
            }
        }
        Command::Export => {
            let user = store.export(uid)?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::DeleteUser => {
            store.delete(uid)?;
            println!("All data for user {uid} removed.");
        }
        Command::Digest => {
            let client = HttpJobSearch::new(&config.scraper)?;
            let scheduler =
                DigestScheduler::new(store, client, LogNotifier, config.digest.clone());
            let stats = scheduler.sweep().await;
            println!(
                "digest: {} users, {} due, {} jobs sent, {} failures",
                stats.users_seen, stats.searches_due, stats.jobs_sent, stats.failures
            );
        }
        Command::Watch => {
            let client = HttpJobSearch::new(&config.scraper)?;
            let scheduler =
                DigestScheduler::new(store, client, LogNotifier, config.digest.clone());
            scheduler.run().await;
        }
    }

    Ok(())
}
