use chrono::Utc;
use clap::Subcommand;
use viralreels_core::{FeedFilter, FeedSort};
use viralreels_db::ReelFeedQuery;

#[derive(Debug, Subcommand)]
pub enum ReelsCommands {
    /// List the top reels from the feed
    Top {
        /// all, last24h, rising_stars or audio_trending
        #[arg(long, default_value = "all")]
        filter: FeedFilter,

        /// virality, views, shares or comments
        #[arg(long, default_value = "virality")]
        sort: FeedSort,

        /// Case-insensitive caption search
        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// List the most used licensed audio tracks
    Audio {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run(pool: &sqlx::PgPool, command: ReelsCommands) -> anyhow::Result<()> {
    match command {
        ReelsCommands::Top {
            filter,
            sort,
            search,
            limit,
        } => run_reels_top(pool, filter, sort, search.as_deref(), limit).await,
        ReelsCommands::Audio { limit } => run_reels_audio(pool, limit).await,
    }
}

async fn run_reels_top(
    pool: &sqlx::PgPool,
    filter: FeedFilter,
    sort: FeedSort,
    search: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let query = ReelFeedQuery {
        filter,
        sort,
        account_id: None,
        search,
        limit: limit.clamp(1, 100),
        offset: 0,
        now: Utc::now(),
    };
    let reels = viralreels_db::list_reels(pool, &query).await?;

    if reels.is_empty() {
        println!(
            "no reels found for filter {}; run `jobs ensure` and `jobs run` first",
            filter.as_str()
        );
        return Ok(());
    }

    println!(
        "{:<7}{:<18}{:<12}{:<10}{:<10}{:<20}URL",
        "SCORE", "CATEGORY", "VIEWS", "SHARES", "RISING", "AUTHOR"
    );
    for reel in &reels {
        println!(
            "{:<7.1}{:<18}{:<12}{:<10}{:<10}{:<20}{}",
            reel.viral_score,
            reel.viral_category,
            reel.view_count,
            reel.share_count,
            if reel.is_rising_star { "yes" } else { "" },
            reel.author_username.as_deref().unwrap_or("-"),
            reel.url
        );
    }

    Ok(())
}

async fn run_reels_audio(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let tracks = viralreels_db::trending_audio(pool, limit.clamp(1, 50)).await?;

    if tracks.is_empty() {
        println!("no licensed audio found");
        return Ok(());
    }

    println!("{:<8}{:<14}{:<8}TRACK", "REELS", "VIEWS", "TOP");
    for track in &tracks {
        println!(
            "{:<8}{:<14}{:<8.1}{}",
            track.reel_count, track.total_views, track.top_viral_score, track.audio_track
        );
    }

    Ok(())
}
