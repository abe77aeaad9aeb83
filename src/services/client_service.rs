use std::collections::HashSet;

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::{BeneficiaryInput, Client, ClientDetail, CreateClient, NewClient, UpdateClient};
use crate::utils::dates::{default_birth_date, parse_birth_date};
use crate::utils::id_number::{normalize_id_number, MAX_ID_DIGITS};

const MAX_BENEFICIARIES: i32 = 4;

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn join_names(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn build_new_client(input: CreateClient) -> Result<NewClient, AppError> {
    let id_number = normalize_id_number(&input.id_number);
    if id_number.is_empty() {
        return Err(AppError::Validation("Client id number is required".into()));
    }
    if id_number.len() > MAX_ID_DIGITS {
        return Err(AppError::Validation(format!(
            "Client id number must have at most {} digits",
            MAX_ID_DIGITS
        )));
    }

    let first_name = non_empty(input.first_name);
    let last_name = non_empty(input.last_name);
    let full_name = match non_empty(input.full_name) {
        Some(name) => name,
        None => join_names(first_name.as_deref(), last_name.as_deref()),
    };
    if full_name.is_empty() {
        return Err(AppError::Validation("Client name is required".into()));
    }

    Ok(NewClient {
        id_number_raw: input.id_number.trim().to_string(),
        id_number,
        full_name,
        first_name,
        last_name,
        birth_date: parse_birth_date(input.birth_date.as_deref()),
        gender: input.gender,
        marital_status: input.marital_status,
        birth_country: input.birth_country,
        employer_name: input.employer_name,
        employer_hp: input.employer_hp,
        employer_address: input.employer_address,
        employer_phone: input.employer_phone,
        email: input.email,
        phone: input.phone,
        address_street: input.address_street,
        address_city: input.address_city,
        address_house_number: input.address_house_number,
        address_apartment: input.address_apartment,
        address_postal_code: input.address_postal_code,
    })
}

/// Copies provided fields onto `client`. Beneficiaries are handled separately.
pub(crate) fn apply_update(client: &mut Client, update: &UpdateClient) {
    fn set(target: &mut Option<String>, value: &Option<String>) {
        if let Some(v) = value {
            *target = Some(v.clone());
        }
    }

    set(&mut client.first_name, &update.first_name);
    set(&mut client.last_name, &update.last_name);
    set(&mut client.email, &update.email);
    set(&mut client.phone, &update.phone);
    set(&mut client.address_street, &update.address_street);
    set(&mut client.address_city, &update.address_city);
    set(&mut client.address_postal_code, &update.address_postal_code);
    set(&mut client.address_house_number, &update.address_house_number);
    set(&mut client.address_apartment, &update.address_apartment);
    set(&mut client.gender, &update.gender);
    set(&mut client.marital_status, &update.marital_status);
    set(&mut client.birth_country, &update.birth_country);
    set(&mut client.employer_name, &update.employer_name);
    set(&mut client.employer_hp, &update.employer_hp);
    set(&mut client.employer_address, &update.employer_address);
    set(&mut client.employer_phone, &update.employer_phone);

    if let Some(raw) = update.birth_date.as_deref().map(str::trim) {
        if raw.is_empty() {
            client.birth_date = default_birth_date();
        } else if let Ok(date) = NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d") {
            client.birth_date = date;
        }
    }

    let names_changed = [&update.first_name, &update.last_name]
        .iter()
        .any(|v| v.as_deref().is_some_and(|s| !s.is_empty()));
    if names_changed {
        let full = join_names(client.first_name.as_deref(), client.last_name.as_deref());
        if !full.is_empty() {
            client.full_name = full;
        }
    }
}

pub(crate) fn validate_beneficiaries(
    items: &[BeneficiaryInput],
) -> Result<Vec<(BeneficiaryInput, NaiveDate)>, AppError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if !(1..=MAX_BENEFICIARIES).contains(&item.index) {
            return Err(AppError::Validation(format!(
                "Beneficiary index must be between 1 and {}",
                MAX_BENEFICIARIES
            )));
        }
        if !seen.insert(item.index) {
            return Err(AppError::Validation(format!("Duplicate beneficiary index {}", item.index)));
        }
        if !(0.0..=100.0).contains(&item.percentage) {
            return Err(AppError::Validation("Beneficiary percentage must be between 0 and 100".into()));
        }
        out.push((item.clone(), parse_birth_date(Some(&item.birth_date))));
    }
    Ok(out)
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Client>, AppError> {
    let clients = db::client_queries::fetch_all(pool).await?;
    Ok(clients)
}

pub(crate) async fn fetch_one(pool: &PgPool, id: i64) -> Result<Client, AppError> {
    let client = db::client_queries::fetch_one(pool, id)
        .await?
        .ok_or(AppError::NotFound("Client not found".to_string()))?;
    Ok(client)
}

pub async fn fetch_detail(pool: &PgPool, id: i64) -> Result<ClientDetail, AppError> {
    let client = fetch_one(pool, id).await?;
    let beneficiaries = db::beneficiary_queries::fetch_for_client(pool, id).await?;
    Ok(ClientDetail { client, beneficiaries })
}

pub async fn create(pool: &PgPool, input: CreateClient) -> Result<ClientDetail, AppError> {
    let new_client = build_new_client(input)?;

    if db::client_queries::fetch_by_id_number(pool, &new_client.id_number)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Client with this id number already exists".into()));
    }

    let client = db::client_queries::create(pool, &new_client).await?;
    Ok(ClientDetail {
        client,
        beneficiaries: Vec::new(),
    })
}

pub async fn update(pool: &PgPool, id: i64, input: UpdateClient) -> Result<ClientDetail, AppError> {
    let mut client = fetch_one(pool, id).await?;
    apply_update(&mut client, &input);

    let beneficiaries = match input.beneficiaries.as_deref() {
        Some(items) => Some(validate_beneficiaries(items)?),
        None => None,
    };

    let mut tx = pool.begin().await?;
    db::client_queries::update(&mut *tx, &client)
        .await?
        .ok_or(AppError::NotFound("Client not found".to_string()))?;
    if let Some(items) = beneficiaries {
        db::beneficiary_queries::replace_for_client(&mut tx, id, &items).await?;
    }
    tx.commit().await?;

    fetch_detail(pool, id).await
}

pub(crate) async fn delete(pool: &PgPool, id: i64) -> Result<u64, AppError> {
    match db::client_queries::delete(pool, id).await {
        Ok(0) => Err(AppError::NotFound("Client not found".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(AppError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored_client() -> Client {
        Client {
            id: 1,
            id_number_raw: "012345678".to_string(),
            id_number: "12345678".to_string(),
            full_name: "דנה לוי".to_string(),
            first_name: Some("דנה".to_string()),
            last_name: Some("לוי".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1980, 6, 1).unwrap(),
            gender: None,
            marital_status: None,
            birth_country: None,
            employer_name: None,
            employer_hp: None,
            employer_address: None,
            employer_phone: None,
            email: None,
            phone: None,
            address_street: None,
            address_city: None,
            address_house_number: None,
            address_apartment: None,
            address_postal_code: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn beneficiary(index: i32, percentage: f64) -> BeneficiaryInput {
        BeneficiaryInput {
            index,
            first_name: "נועה".to_string(),
            last_name: "לוי".to_string(),
            id_number: "123456782".to_string(),
            birth_date: "2010-02-03".to_string(),
            address: "תל אביב".to_string(),
            relation: "בת".to_string(),
            percentage,
        }
    }

    #[test]
    fn test_new_client_normalizes_id_and_derives_name() {
        let input = CreateClient {
            id_number: "012-345-678".to_string(),
            first_name: Some(" דנה ".to_string()),
            last_name: Some("לוי".to_string()),
            ..Default::default()
        };
        let client = build_new_client(input).unwrap();
        assert_eq!(client.id_number, "12345678");
        assert_eq!(client.id_number_raw, "012-345-678");
        assert_eq!(client.full_name, "דנה לוי");
        assert_eq!(client.birth_date, default_birth_date());
    }

    #[test]
    fn test_new_client_requires_id_number() {
        let input = CreateClient {
            id_number: "---".to_string(),
            full_name: Some("Someone".to_string()),
            ..Default::default()
        };
        assert!(matches!(build_new_client(input), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_new_client_rejects_overlong_id_number() {
        let input = CreateClient {
            id_number: "1234567891".to_string(),
            full_name: Some("Someone".to_string()),
            ..Default::default()
        };
        let err = build_new_client(input).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("at most 9 digits")));
    }

    #[test]
    fn test_update_recomputes_full_name() {
        let mut client = stored_client();
        let update = UpdateClient {
            last_name: Some("כהן".to_string()),
            ..Default::default()
        };
        apply_update(&mut client, &update);
        assert_eq!(client.full_name, "דנה כהן");
    }

    #[test]
    fn test_update_empty_birth_date_resets_default() {
        let mut client = stored_client();
        let update = UpdateClient {
            birth_date: Some(String::new()),
            ..Default::default()
        };
        apply_update(&mut client, &update);
        assert_eq!(client.birth_date, default_birth_date());

        let update = UpdateClient {
            birth_date: Some("garbage".to_string()),
            ..Default::default()
        };
        apply_update(&mut client, &update);
        assert_eq!(client.birth_date, default_birth_date());
    }

    #[test]
    fn test_beneficiary_validation() {
        assert_eq!(validate_beneficiaries(&[beneficiary(1, 60.0), beneficiary(2, 40.0)]).unwrap().len(), 2);
        assert!(validate_beneficiaries(&[beneficiary(5, 10.0)]).is_err());
        assert!(validate_beneficiaries(&[beneficiary(1, 120.0)]).is_err());
        assert!(validate_beneficiaries(&[beneficiary(1, 10.0), beneficiary(1, 10.0)]).is_err());
    }
}
