//! tweetpool - query the social network's GraphQL API through pooled sessions
//!
//! Prints every result as pretty JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tweetpool::cache::CacheStore;
use tweetpool::cli::{Cli, Command, Query};
use tweetpool::client::GraphClient;
use tweetpool::error::ClientError;
use tweetpool::session::SessionPool;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_query(client: &GraphClient, query: &Query) -> Result<()> {
    match query {
        Query::User { handle } => print_json(&client.get_user_by_screen_name(handle).await?),
        Query::UserId { user_id } => print_json(&client.get_user_by_id(user_id).await?),
        Query::Tweets { user_id, cursor } => {
            print_json(&client.get_user_tweets(user_id, cursor.as_deref()).await?)
        }
        Query::Replies { user_id, cursor } => print_json(
            &client
                .get_user_tweets_and_replies(user_id, cursor.as_deref())
                .await?,
        ),
        Query::Tweet { tweet_id } => print_json(&client.get_tweet(tweet_id).await?),
        Query::Search { query, cursor } => {
            print_json(&client.search_tweets(query, cursor.as_deref()).await?)
        }
        Query::Profile { handle, cursor } => {
            print_json(&client.get_profile(handle, cursor.as_deref()).await?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.client_config();

    match &cli.command {
        Command::Sessions => {
            let pool = SessionPool::from_file(&config.sessions_path, config.default_backoff)?;
            print_json(&pool.statuses())
        }
        Command::PurgeCache => {
            let cache: CacheStore<ClientError> = CacheStore::new(
                config.disk_cache(),
                config.wait_timeout,
                config.stale_retention,
            );
            let purged = cache.purge_expired();
            info!(purged, "cache purged");
            print_json(&serde_json::json!({ "purged": purged }))
        }
        Command::Query(query) => {
            let client =
                GraphClient::from_config(&config).context("failed to initialise client")?;
            info!(sessions = client.pool().len(), "client ready");
            run_query(&client, query).await
        }
    }
}
