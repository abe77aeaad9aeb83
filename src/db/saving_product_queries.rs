use sqlx::PgExecutor;

use crate::models::SavingProduct;

const SAVING_PRODUCT_COLUMNS: &str = "id, fund_type, company_name, fund_name, fund_code,
    yield_1yr, yield_3yr, risk_level, guaranteed_return";

pub async fn fetch_all<'e, E>(executor: E) -> Result<Vec<SavingProduct>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, SavingProduct>(&format!(
        "SELECT {} FROM saving_product ORDER BY company_name, fund_name, id",
        SAVING_PRODUCT_COLUMNS
    ))
    .fetch_all(executor)
    .await
}

pub async fn find_by_key<'e, E>(
    executor: E,
    fund_type: &str,
    company_name: &str,
    fund_name: &str,
    fund_code: &str,
) -> Result<Option<SavingProduct>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, SavingProduct>(&format!(
        "SELECT {} FROM saving_product
         WHERE fund_type = $1 AND company_name = $2 AND fund_name = $3 AND fund_code = $4
         ORDER BY id
         LIMIT 1",
        SAVING_PRODUCT_COLUMNS
    ))
    .bind(fund_type)
    .bind(company_name)
    .bind(fund_name)
    .bind(fund_code)
    .fetch_optional(executor)
    .await
}

pub async fn create<'e, E>(executor: E, input: &SavingProduct) -> Result<SavingProduct, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, SavingProduct>(&format!(
        "INSERT INTO saving_product
         (fund_type, company_name, fund_name, fund_code, yield_1yr, yield_3yr, risk_level, guaranteed_return)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {}",
        SAVING_PRODUCT_COLUMNS
    ))
    .bind(&input.fund_type)
    .bind(&input.company_name)
    .bind(&input.fund_name)
    .bind(&input.fund_code)
    .bind(input.yield_1yr)
    .bind(input.yield_3yr)
    .bind(input.risk_level)
    .bind(&input.guaranteed_return)
    .fetch_one(executor)
    .await
}

pub async fn update_yields<'e, E>(
    executor: E,
    id: i64,
    yield_1yr: Option<f64>,
    yield_3yr: Option<f64>,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("UPDATE saving_product SET yield_1yr = $2, yield_3yr = $3 WHERE id = $1")
        .bind(id)
        .bind(yield_1yr)
        .bind(yield_3yr)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM saving_product").execute(executor).await?;
    Ok(result.rows_affected())
}
