use sqlx::{PgExecutor, PgPool};

use crate::models::{CreateFormInstance, FormInstance};

const FORM_INSTANCE_COLUMNS: &str =
    "id, new_product_id, template_filename, generated_at, status, filled_data, file_output_path";

pub async fn fetch_for_new_product(pool: &PgPool, new_product_id: i64) -> Result<Vec<FormInstance>, sqlx::Error> {
    sqlx::query_as::<_, FormInstance>(&format!(
        "SELECT {} FROM form_instance
         WHERE new_product_id = $1
         ORDER BY generated_at DESC, id DESC",
        FORM_INSTANCE_COLUMNS
    ))
    .bind(new_product_id)
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    new_product_id: i64,
    status: &str,
    input: &CreateFormInstance,
) -> Result<FormInstance, sqlx::Error> {
    sqlx::query_as::<_, FormInstance>(&format!(
        "INSERT INTO form_instance (new_product_id, template_filename, status, filled_data, file_output_path)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        FORM_INSTANCE_COLUMNS
    ))
    .bind(new_product_id)
    .bind(&input.template_filename)
    .bind(status)
    .bind(&input.filled_data)
    .bind(&input.file_output_path)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM form_instance WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM form_instance").execute(executor).await?;
    Ok(result.rows_affected())
}
