use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use crate::models::{Beneficiary, BeneficiaryInput};

pub async fn fetch_for_client(pool: &PgPool, client_id: i64) -> Result<Vec<Beneficiary>, sqlx::Error> {
    sqlx::query_as::<_, Beneficiary>(
        "SELECT id, client_id, idx, first_name, last_name, id_number, birth_date, address,
                relation, percentage
         FROM client_beneficiary
         WHERE client_id = $1
         ORDER BY idx, id",
    )
    .bind(client_id)
    .fetch_all(pool)
    .await
}

/// Replaces the whole beneficiary set of a client; run inside a transaction.
pub async fn replace_for_client(
    conn: &mut PgConnection,
    client_id: i64,
    beneficiaries: &[(BeneficiaryInput, NaiveDate)],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM client_beneficiary WHERE client_id = $1")
        .bind(client_id)
        .execute(&mut *conn)
        .await?;

    for (b, birth_date) in beneficiaries {
        sqlx::query(
            "INSERT INTO client_beneficiary
             (client_id, idx, first_name, last_name, id_number, birth_date, address, relation, percentage)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(client_id)
        .bind(b.index)
        .bind(b.first_name.trim())
        .bind(b.last_name.trim())
        .bind(b.id_number.trim())
        .bind(*birth_date)
        .bind(b.address.trim())
        .bind(b.relation.trim())
        .bind(b.percentage)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
