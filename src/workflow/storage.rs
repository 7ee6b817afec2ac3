/// SQLite persistence layer for workflows, steps and bots
///
/// Workflows keep their trigger as JSON next to indexed lookup columns. Steps
/// live in their own table so the engine can fetch them in execution order;
/// the autoincrement `seq` column records insertion order for tie-breaks.

use crate::workflow::types::{Bot, StepMeta, TriggerSpec, Workflow, WorkflowStep};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow},
    Row,
};
use std::{collections::HashMap, str::FromStr};

/// Step definitions for one workflow, active only, in execution order
#[async_trait]
pub trait StepSource: Send + Sync {
    async fn find_active_steps(&self, workflow_id: &str) -> Result<Vec<WorkflowStep>>;
}

/// Bot records used to build the bot registry at startup
#[async_trait]
pub trait BotSource: Send + Sync {
    async fn find_active_bots(&self) -> Result<Vec<Bot>>;
}

/// SQLite-based storage manager
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    /// SQLite connection pool
    pool: SqlitePool,
}

impl WorkflowStorage {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (and create if missing) the database behind `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let parent = options.get_filename().parent().map(|p| p.to_path_buf());
        if let Some(dir) = parent.filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(&dir).map_err(|e| {
                anyhow::anyhow!("Failed to create data directory '{}': {}", dir.display(), e)
            })?;
        }

        tracing::info!("🗄️ Opening workflow database: {}", url);
        let pool = SqlitePool::connect_with(options).await?;
        Ok(Self::new(pool))
    }

    /// Initialize the storage schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                trigger_spec JSON NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflow_steps (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                workflow_id TEXT NOT NULL,
                variety TEXT NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                meta JSON NOT NULL,
                UNIQUE (workflow_id, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bots (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                user_id TEXT NOT NULL,
                password TEXT NOT NULL,
                homeserver_url TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                is_primary INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_steps_workflow ON workflow_steps(workflow_id, sort_order)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a workflow and replace its step list
    ///
    /// Steps are inserted in the given order, which becomes the tie-break
    /// order for equal sort keys.
    pub async fn save_workflow(&self, workflow: &Workflow, steps: &[WorkflowStep]) -> Result<()> {
        let trigger_json = serde_json::to_string(&workflow.trigger)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, active, trigger_spec, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                active = excluded.active,
                trigger_spec = excluded.trigger_spec,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.name)
        .bind(workflow.active)
        .bind(&trigger_json)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM workflow_steps WHERE workflow_id = ?")
            .bind(&workflow.id)
            .execute(&mut *tx)
            .await?;

        for step in steps {
            let meta_json = serde_json::to_string(&step.meta)?;
            sqlx::query(
                r#"
                INSERT INTO workflow_steps (id, workflow_id, variety, sort_order, active, meta)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&step.id)
            .bind(&workflow.id)
            .bind(&step.variety)
            .bind(step.sort_order)
            .bind(step.active)
            .bind(&meta_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Retrieve a workflow by ID
    pub async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>> {
        let row = sqlx::query("SELECT id, name, active, trigger_spec FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| workflow_from_row(&row)).transpose()
    }

    /// List all workflows with basic metadata
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowMetadata>> {
        let rows = sqlx::query(
            "SELECT id, name, active, trigger_spec, created_at, updated_at FROM workflows ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut workflows = Vec::new();
        for row in rows {
            let workflow = workflow_from_row(&row)?;
            workflows.push(WorkflowMetadata {
                id: workflow.id,
                name: workflow.name,
                active: workflow.active,
                trigger: workflow.trigger,
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(workflows)
    }

    /// Load all workflows for registry initialization
    pub async fn load_all_workflows(&self) -> Result<HashMap<String, Workflow>> {
        let rows = sqlx::query("SELECT id, name, active, trigger_spec FROM workflows")
            .fetch_all(&self.pool)
            .await?;

        let mut workflows = HashMap::new();
        for row in rows {
            let workflow = workflow_from_row(&row)?;
            workflows.insert(workflow.id.clone(), workflow);
        }

        Ok(workflows)
    }

    /// All steps of a workflow (active and inactive) in execution order
    pub async fn list_steps(&self, workflow_id: &str) -> Result<Vec<WorkflowStep>> {
        let rows = sqlx::query(
            r#"
            SELECT id, workflow_id, variety, sort_order, active, meta
            FROM workflow_steps
            WHERE workflow_id = ?
            ORDER BY sort_order ASC, seq ASC
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(step_from_row).collect()
    }

    /// Delete a workflow and its steps
    pub async fn delete_workflow(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM workflow_steps WHERE workflow_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a new bot or update an existing one
    pub async fn save_bot(&self, bot: &Bot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bots (id, display_name, user_id, password, homeserver_url, active, is_primary)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                user_id = excluded.user_id,
                password = excluded.password,
                homeserver_url = excluded.homeserver_url,
                active = excluded.active,
                is_primary = excluded.is_primary
            "#,
        )
        .bind(&bot.id)
        .bind(&bot.display_name)
        .bind(&bot.user_id)
        .bind(&bot.password)
        .bind(&bot.homeserver_url)
        .bind(bot.active)
        .bind(bot.primary)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All bots, active or not, in insertion order
    pub async fn list_bots(&self) -> Result<Vec<Bot>> {
        let rows = sqlx::query(
            "SELECT id, display_name, user_id, password, homeserver_url, active, is_primary FROM bots ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(bot_from_row).collect())
    }
}

#[async_trait]
impl StepSource for WorkflowStorage {
    async fn find_active_steps(&self, workflow_id: &str) -> Result<Vec<WorkflowStep>> {
        let rows = sqlx::query(
            r#"
            SELECT id, workflow_id, variety, sort_order, active, meta
            FROM workflow_steps
            WHERE workflow_id = ? AND active = 1
            ORDER BY sort_order ASC, seq ASC
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(step_from_row).collect()
    }
}

#[async_trait]
impl BotSource for WorkflowStorage {
    async fn find_active_bots(&self) -> Result<Vec<Bot>> {
        let rows = sqlx::query(
            r#"
            SELECT id, display_name, user_id, password, homeserver_url, active, is_primary
            FROM bots
            WHERE active = 1
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(bot_from_row).collect())
    }
}

fn workflow_from_row(row: &SqliteRow) -> Result<Workflow> {
    let trigger_json: String = row.get("trigger_spec");
    let trigger: TriggerSpec = serde_json::from_str(&trigger_json)?;
    Ok(Workflow {
        id: row.get("id"),
        name: row.get("name"),
        active: row.get("active"),
        trigger,
    })
}

fn step_from_row(row: &SqliteRow) -> Result<WorkflowStep> {
    let meta_json: String = row.get("meta");
    let meta: StepMeta = serde_json::from_str(&meta_json)?;
    Ok(WorkflowStep {
        id: row.get("id"),
        workflow_id: row.get("workflow_id"),
        variety: row.get("variety"),
        sort_order: row.get("sort_order"),
        active: row.get("active"),
        meta,
    })
}

fn bot_from_row(row: &SqliteRow) -> Bot {
    Bot {
        id: row.get("id"),
        display_name: row.get("display_name"),
        user_id: row.get("user_id"),
        password: row.get("password"),
        homeserver_url: row.get("homeserver_url"),
        active: row.get("active"),
        primary: row.get("is_primary"),
    }
}

/// Basic workflow metadata for listing operations
#[derive(Debug, serde::Serialize)]
pub struct WorkflowMetadata {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub trigger: TriggerSpec,
    pub created_at: String,
    pub updated_at: String,
}
