use serde::Serialize;

use sqlx::types::Json;
use sqlx::{Row, SqliteConnection};

use crate::domain::Language;

const TOP_LIMIT: i64 = 10;
const RECENT_EVENTS_LIMIT: i64 = 20;

#[derive(Debug)]
pub struct NewPageview {
    pub session_id: String,
    pub path: String,
    pub referrer: Option<String>,
    pub lang: Language,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
pub struct NewEvent {
    pub session_id: String,
    pub name: String,
    pub path: Option<String>,
    pub properties: Option<serde_json::Value>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    /// `YYYY-MM-DD`, UTC
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentEvent {
    pub name: String,
    pub path: Option<String>,
    /// Unix seconds
    pub created_at: i64,
}

/// Aggregates over a reporting window, plus "today" figures
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_pageviews: i64,
    pub unique_sessions: i64,
    pub total_events: i64,
    pub pageviews_today: i64,
    pub sessions_today: i64,
    pub avg_pages_per_session: f64,
    pub top_pages: Vec<NamedCount>,
    pub top_referrers: Vec<NamedCount>,
    pub top_events: Vec<NamedCount>,
    pub pageviews_by_day: Vec<DailyCount>,
    pub languages: Vec<NamedCount>,
}

/// Activity within the trailing realtime window
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeStats {
    pub active_sessions: i64,
    pub pageviews: i64,
    pub active_pages: Vec<NamedCount>,
    pub recent_events: Vec<RecentEvent>,
}

/// Repository for the analytics tables.
///
/// The aggregate readers issue every query on one connection, so callers should pass a
/// transaction to get a consistent snapshot. sqlx keeps the prepared statements cached
/// on the connection, which makes repeated dashboard loads cheap.
pub struct AnalyticsRepo;

impl AnalyticsRepo {
    /// Create the session on first sight, otherwise bump its last activity
    async fn touch_session(
        conn: &mut SqliteConnection,
        session_id: &str,
        user_agent: Option<&str>,
        lang: Option<Language>,
        now: i64,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "insert into analytics_sessions(id, user_agent, lang, started_at, last_seen_at) \
             values (?1, ?2, coalesce(?3, 'en'), ?4, ?4) \
             on conflict(id) do update set last_seen_at = excluded.last_seen_at, \
             lang = coalesce(?3, analytics_sessions.lang)",
        )
        .bind(session_id)
        .bind(user_agent)
        .bind(lang.map(|lang| lang.as_str()))
        .bind(now)
        .execute(conn)
        .await?;
        Ok(())
    }

    #[tracing::instrument(name = "Record pageview", skip(conn, pageview), fields(path = %pageview.path))]
    pub async fn record_pageview(
        conn: &mut SqliteConnection,
        pageview: &NewPageview,
        now: i64,
    ) -> sqlx::Result<i64> {
        Self::touch_session(
            &mut *conn,
            &pageview.session_id,
            pageview.user_agent.as_deref(),
            Some(pageview.lang),
            now,
        )
        .await?;

        let row = sqlx::query(
            "insert into analytics_pageviews(session_id, path, referrer, lang, created_at) \
             values (?1, ?2, ?3, ?4, ?5) returning id",
        )
        .bind(&pageview.session_id)
        .bind(&pageview.path)
        .bind(&pageview.referrer)
        .bind(pageview.lang.as_str())
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        row.try_get("id")
    }

    #[tracing::instrument(name = "Record event", skip(conn, event), fields(name = %event.name))]
    pub async fn record_event(
        conn: &mut SqliteConnection,
        event: &NewEvent,
        now: i64,
    ) -> sqlx::Result<i64> {
        Self::touch_session(
            &mut *conn,
            &event.session_id,
            event.user_agent.as_deref(),
            None,
            now,
        )
        .await?;

        let row = sqlx::query(
            "insert into analytics_events(session_id, name, path, properties, created_at) \
             values (?1, ?2, ?3, ?4, ?5) returning id",
        )
        .bind(&event.session_id)
        .bind(&event.name)
        .bind(&event.path)
        .bind(event.properties.as_ref().map(Json))
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        row.try_get("id")
    }

    /// Dashboard aggregates for activity since `window_start`, with "today" measured
    /// from `today_start` (both unix seconds)
    #[tracing::instrument(name = "Aggregate analytics dashboard", skip(conn))]
    pub async fn dashboard(
        conn: &mut SqliteConnection,
        window_start: i64,
        today_start: i64,
    ) -> sqlx::Result<DashboardStats> {
        let total_pageviews = sqlx::query_scalar::<_, i64>(
            "select count(*) from analytics_pageviews where created_at >= ?1",
        )
        .bind(window_start)
        .fetch_one(&mut *conn)
        .await?;

        let unique_sessions = sqlx::query_scalar::<_, i64>(
            "select count(distinct session_id) from analytics_pageviews where created_at >= ?1",
        )
        .bind(window_start)
        .fetch_one(&mut *conn)
        .await?;

        let total_events = sqlx::query_scalar::<_, i64>(
            "select count(*) from analytics_events where created_at >= ?1",
        )
        .bind(window_start)
        .fetch_one(&mut *conn)
        .await?;

        let pageviews_today = sqlx::query_scalar::<_, i64>(
            "select count(*) from analytics_pageviews where created_at >= ?1",
        )
        .bind(today_start)
        .fetch_one(&mut *conn)
        .await?;

        let sessions_today = sqlx::query_scalar::<_, i64>(
            "select count(distinct session_id) from analytics_pageviews where created_at >= ?1",
        )
        .bind(today_start)
        .fetch_one(&mut *conn)
        .await?;

        let avg_pages_per_session = sqlx::query_scalar::<_, f64>(
            "select coalesce(avg(views), 0.0) from ( \
             select count(*) as views from analytics_pageviews \
             where created_at >= ?1 group by session_id)",
        )
        .bind(window_start)
        .fetch_one(&mut *conn)
        .await?;

        let top_pages = sqlx::query_as::<_, NamedCount>(
            "select path as name, count(*) as count from analytics_pageviews \
             where created_at >= ?1 group by path order by count desc, name limit ?2",
        )
        .bind(window_start)
        .bind(TOP_LIMIT)
        .fetch_all(&mut *conn)
        .await?;

        let top_referrers = sqlx::query_as::<_, NamedCount>(
            "select referrer as name, count(*) as count from analytics_pageviews \
             where created_at >= ?1 and referrer is not null and referrer != '' \
             group by referrer order by count desc, name limit ?2",
        )
        .bind(window_start)
        .bind(TOP_LIMIT)
        .fetch_all(&mut *conn)
        .await?;

        let top_events = sqlx::query_as::<_, NamedCount>(
            "select name, count(*) as count from analytics_events \
             where created_at >= ?1 group by name order by count desc, name limit ?2",
        )
        .bind(window_start)
        .bind(TOP_LIMIT)
        .fetch_all(&mut *conn)
        .await?;

        let pageviews_by_day = sqlx::query_as::<_, DailyCount>(
            "select date(created_at, 'unixepoch') as day, count(*) as count \
             from analytics_pageviews where created_at >= ?1 group by day order by day",
        )
        .bind(window_start)
        .fetch_all(&mut *conn)
        .await?;

        let languages = sqlx::query_as::<_, NamedCount>(
            "select lang as name, count(*) as count from analytics_pageviews \
             where created_at >= ?1 group by lang order by count desc, name",
        )
        .bind(window_start)
        .fetch_all(&mut *conn)
        .await?;

        Ok(DashboardStats {
            total_pageviews,
            unique_sessions,
            total_events,
            pageviews_today,
            sessions_today,
            avg_pages_per_session,
            top_pages,
            top_referrers,
            top_events,
            pageviews_by_day,
            languages,
        })
    }

    /// Activity since `window_start` (unix seconds), normally the last few minutes
    #[tracing::instrument(name = "Aggregate realtime analytics", skip(conn))]
    pub async fn realtime(
        conn: &mut SqliteConnection,
        window_start: i64,
    ) -> sqlx::Result<RealtimeStats> {
        let active_sessions = sqlx::query_scalar::<_, i64>(
            "select count(*) from analytics_sessions where last_seen_at >= ?1",
        )
        .bind(window_start)
        .fetch_one(&mut *conn)
        .await?;

        let pageviews = sqlx::query_scalar::<_, i64>(
            "select count(*) from analytics_pageviews where created_at >= ?1",
        )
        .bind(window_start)
        .fetch_one(&mut *conn)
        .await?;

        let active_pages = sqlx::query_as::<_, NamedCount>(
            "select path as name, count(distinct session_id) as count from analytics_pageviews \
             where created_at >= ?1 group by path order by count desc, name limit ?2",
        )
        .bind(window_start)
        .bind(TOP_LIMIT)
        .fetch_all(&mut *conn)
        .await?;

        let recent_events = sqlx::query_as::<_, RecentEvent>(
            "select name, path, created_at from analytics_events \
             where created_at >= ?1 order by created_at desc, id desc limit ?2",
        )
        .bind(window_start)
        .bind(RECENT_EVENTS_LIMIT)
        .fetch_all(&mut *conn)
        .await?;

        Ok(RealtimeStats {
            active_sessions,
            pageviews,
            active_pages,
            recent_events,
        })
    }
}
