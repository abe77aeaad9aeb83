use sqlx::{PgExecutor, PgPool};

use crate::models::{CreateNewProduct, NewProduct};

const NEW_PRODUCT_COLUMNS: &str = "id, client_id, existing_product_id, fund_type, company_name,
    fund_name, fund_code, yield_1yr, yield_3yr, personal_number, management_fee_balance,
    management_fee_contributions, accumulated_amount, employment_status,
    has_regular_contributions, created_at";

pub async fn fetch_for_client(pool: &PgPool, client_id: i64) -> Result<Vec<NewProduct>, sqlx::Error> {
    sqlx::query_as::<_, NewProduct>(&format!(
        "SELECT {} FROM new_product
         WHERE client_id = $1
         ORDER BY created_at DESC, id DESC",
        NEW_PRODUCT_COLUMNS
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: i64) -> Result<Option<NewProduct>, sqlx::Error> {
    sqlx::query_as::<_, NewProduct>(&format!(
        "SELECT {} FROM new_product WHERE id = $1",
        NEW_PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create<'e, E>(
    executor: E,
    client_id: i64,
    existing_product_id: Option<i64>,
    input: &CreateNewProduct,
) -> Result<NewProduct, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, NewProduct>(&format!(
        "INSERT INTO new_product
         (client_id, existing_product_id, fund_type, company_name, fund_name, fund_code,
          yield_1yr, yield_3yr, personal_number, management_fee_balance,
          management_fee_contributions, accumulated_amount, employment_status,
          has_regular_contributions)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         RETURNING {}",
        NEW_PRODUCT_COLUMNS
    ))
    .bind(client_id)
    .bind(existing_product_id)
    .bind(&input.fund_type)
    .bind(&input.company_name)
    .bind(&input.fund_name)
    .bind(&input.fund_code)
    .bind(input.yield_1yr)
    .bind(input.yield_3yr)
    .bind(&input.personal_number)
    .bind(input.management_fee_balance)
    .bind(input.management_fee_contributions)
    .bind(input.accumulated_amount)
    .bind(&input.employment_status)
    .bind(input.has_regular_contributions)
    .fetch_one(executor)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM new_product WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM new_product").execute(executor).await?;
    Ok(result.rows_affected())
}
