use sqlx::{PgExecutor, PgPool};

use crate::models::{CreateExistingProduct, ExistingProduct};

const EXISTING_PRODUCT_COLUMNS: &str = "id, client_id, fund_type, company_name, fund_name, fund_code,
    yield_1yr, yield_3yr, personal_number, management_fee_balance, management_fee_contributions,
    accumulated_amount, employment_status, has_regular_contributions";

pub async fn fetch_for_client<'e, E>(executor: E, client_id: i64) -> Result<Vec<ExistingProduct>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ExistingProduct>(&format!(
        "SELECT {} FROM existing_product
         WHERE client_id = $1
         ORDER BY company_name, fund_name, id",
        EXISTING_PRODUCT_COLUMNS
    ))
    .bind(client_id)
    .fetch_all(executor)
    .await
}

pub async fn fetch_one<'e, E>(executor: E, id: i64) -> Result<Option<ExistingProduct>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ExistingProduct>(&format!(
        "SELECT {} FROM existing_product WHERE id = $1",
        EXISTING_PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn create<'e, E>(
    executor: E,
    client_id: i64,
    input: &CreateExistingProduct,
) -> Result<ExistingProduct, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ExistingProduct>(&format!(
        "INSERT INTO existing_product
         (client_id, fund_type, company_name, fund_name, fund_code, yield_1yr, yield_3yr,
          personal_number, management_fee_balance, management_fee_contributions,
          accumulated_amount, employment_status, has_regular_contributions)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING {}",
        EXISTING_PRODUCT_COLUMNS
    ))
    .bind(client_id)
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

pub async fn update(pool: &PgPool, product: &ExistingProduct) -> Result<Option<ExistingProduct>, sqlx::Error> {
    sqlx::query_as::<_, ExistingProduct>(&format!(
        "UPDATE existing_product SET
            fund_type = $2, company_name = $3, fund_name = $4, fund_code = $5,
            yield_1yr = $6, yield_3yr = $7, personal_number = $8,
            management_fee_balance = $9, management_fee_contributions = $10,
            accumulated_amount = $11, employment_status = $12, has_regular_contributions = $13
         WHERE id = $1
         RETURNING {}",
        EXISTING_PRODUCT_COLUMNS
    ))
    .bind(product.id)
    .bind(&product.fund_type)
    .bind(&product.company_name)
    .bind(&product.fund_name)
    .bind(&product.fund_code)
    .bind(product.yield_1yr)
    .bind(product.yield_3yr)
    .bind(&product.personal_number)
    .bind(product.management_fee_balance)
    .bind(product.management_fee_contributions)
    .bind(product.accumulated_amount)
    .bind(&product.employment_status)
    .bind(product.has_regular_contributions)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM existing_product WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM existing_product").execute(executor).await?;
    Ok(result.rows_affected())
}
