use anyhow::{Context, Result};
use sqlx::PgPool;

pub async fn run_all(pool: &PgPool) -> Result<()> {
    create_books_table(pool).await?;
    create_books_indexes(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

async fn create_books_table(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            summary TEXT,
            chunks JSONB NOT NULL DEFAULT '[]'::jsonb,
            user_id TEXT,
            uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            processed_at TIMESTAMPTZ,
            metadata JSONB NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('processing', 'completed', 'failed'))
                DEFAULT 'processing'
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create books table")?;
    Ok(())
}

async fn create_books_indexes(pool: &PgPool) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_books_user_id ON books(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_books_uploaded_at ON books(uploaded_at)",
        "CREATE INDEX IF NOT EXISTS idx_books_text ON books
             USING GIN (to_tsvector('simple', title || ' ' || content))",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to create books indexes")?;
    }
    Ok(())
}
