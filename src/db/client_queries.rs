use sqlx::{PgExecutor, PgPool};

use crate::models::{Client, NewClient};

const CLIENT_COLUMNS: &str = "id, id_number_raw, id_number, full_name, first_name, last_name,
    birth_date, gender, marital_status, birth_country, employer_name, employer_hp,
    employer_address, employer_phone, email, phone, address_street, address_city,
    address_house_number, address_apartment, address_postal_code, is_active,
    created_at, updated_at";

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Client>, sqlx::Error> {
    sqlx::query_as::<_, Client>(&format!("SELECT {} FROM client ORDER BY id", CLIENT_COLUMNS))
        .fetch_all(pool)
        .await
}

pub async fn fetch_one<'e, E>(executor: E, id: i64) -> Result<Option<Client>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Client>(&format!("SELECT {} FROM client WHERE id = $1", CLIENT_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn fetch_by_id_number<'e, E>(executor: E, id_number: &str) -> Result<Option<Client>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Client>(&format!(
        "SELECT {} FROM client WHERE id_number = $1",
        CLIENT_COLUMNS
    ))
    .bind(id_number)
    .fetch_optional(executor)
    .await
}

pub async fn create<'e, E>(executor: E, input: &NewClient) -> Result<Client, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Client>(&format!(
        "INSERT INTO client
         (id_number_raw, id_number, full_name, first_name, last_name, birth_date, gender,
          marital_status, birth_country, employer_name, employer_hp, employer_address,
          employer_phone, email, phone, address_street, address_city, address_house_number,
          address_apartment, address_postal_code)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
         RETURNING {}",
        CLIENT_COLUMNS
    ))
    .bind(&input.id_number_raw)
    .bind(&input.id_number)
    .bind(&input.full_name)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.birth_date)
    .bind(&input.gender)
    .bind(&input.marital_status)
    .bind(&input.birth_country)
    .bind(&input.employer_name)
    .bind(&input.employer_hp)
    .bind(&input.employer_address)
    .bind(&input.employer_phone)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address_street)
    .bind(&input.address_city)
    .bind(&input.address_house_number)
    .bind(&input.address_apartment)
    .bind(&input.address_postal_code)
    .fetch_one(executor)
    .await
}

/// Writes every mutable column of `client` back and bumps `updated_at`.
pub async fn update<'e, E>(executor: E, client: &Client) -> Result<Option<Client>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Client>(&format!(
        "UPDATE client SET
            full_name = $2, first_name = $3, last_name = $4, birth_date = $5, gender = $6,
            marital_status = $7, birth_country = $8, employer_name = $9, employer_hp = $10,
            employer_address = $11, employer_phone = $12, email = $13, phone = $14,
            address_street = $15, address_city = $16, address_house_number = $17,
            address_apartment = $18, address_postal_code = $19, updated_at = NOW()
         WHERE id = $1
         RETURNING {}",
        CLIENT_COLUMNS
    ))
    .bind(client.id)
    .bind(&client.full_name)
    .bind(&client.first_name)
    .bind(&client.last_name)
    .bind(client.birth_date)
    .bind(&client.gender)
    .bind(&client.marital_status)
    .bind(&client.birth_country)
    .bind(&client.employer_name)
    .bind(&client.employer_hp)
    .bind(&client.employer_address)
    .bind(&client.employer_phone)
    .bind(&client.email)
    .bind(&client.phone)
    .bind(&client.address_street)
    .bind(&client.address_city)
    .bind(&client.address_house_number)
    .bind(&client.address_apartment)
    .bind(&client.address_postal_code)
    .fetch_optional(executor)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM client WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
