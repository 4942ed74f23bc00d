use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::{Row, SqliteExecutor};

use crate::domain::{EmailAddress, Language, PersonName};

/// Contact request submitted from a lead-generation form
#[derive(Debug)]
pub struct NewLead {
    pub name: PersonName,
    pub email: EmailAddress,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    /// Which widget or page the lead came from (`demo-form`, `pricing-calculator`)
    pub source: String,
    pub lang: Language,
}

/// Stored lead record
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub source: String,
    pub lang: String,
    pub created_at: DateTime<Utc>,
}

pub struct LeadRepo;

impl LeadRepo {
    #[tracing::instrument(name = "Insert lead", skip(executor, lead), fields(source = %lead.source))]
    pub async fn insert<'con>(
        executor: impl SqliteExecutor<'con>,
        lead: &NewLead,
    ) -> sqlx::Result<i64> {
        let row = sqlx::query(
            "insert into leads(name, email, company, phone, message, source, lang, created_at) \
             values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) returning id",
        )
        .bind(lead.name.as_ref())
        .bind(lead.email.as_ref())
        .bind(&lead.company)
        .bind(&lead.phone)
        .bind(&lead.message)
        .bind(&lead.source)
        .bind(lead.lang.as_str())
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;

        row.try_get("id")
    }

    #[tracing::instrument(name = "Fetch all leads", skip(executor))]
    pub async fn fetch_all<'con>(executor: impl SqliteExecutor<'con>) -> sqlx::Result<Vec<Lead>> {
        sqlx::query_as::<_, Lead>("select * from leads order by created_at desc, id desc")
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Delete lead", skip(executor))]
    pub async fn delete<'con>(executor: impl SqliteExecutor<'con>, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from leads where id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
