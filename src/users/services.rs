use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use super::dto::{PartialUser, User};
use crate::{
    config::ColumnMap,
    error::ApiError,
    sheets::{self, Record, Row, SheetGateway, Worksheet},
};

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Compares an id cell with a requested id: equal text, or equal numbers.
pub fn ids_match(cell: &str, requested: &str) -> bool {
    let (cell, requested) = (cell.trim(), requested.trim());
    if cell.is_empty() || requested.is_empty() {
        return false;
    }
    if cell == requested {
        return true;
    }
    match (cell.parse::<f64>(), requested.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn parse_id(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    cell.parse::<i64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Index of the first row whose id column matches `id`.
pub fn find_row(sheet: &Worksheet, columns: &ColumnMap, id: &str) -> Result<usize, ApiError> {
    sheet
        .rows
        .iter()
        .position(|row| sheet.get(row, &columns.id).is_some_and(|cell| ids_match(cell, id)))
        .ok_or_else(|| ApiError::NotFound(id.to_string()))
}

pub fn to_user(sheet: &Worksheet, columns: &ColumnMap, row: &Row) -> Result<User, ApiError> {
    let text = |column: &str| sheet.get(row, column).unwrap_or_default().to_string();
    let id_cell = text(&columns.id);
    let id = parse_id(&id_cell).ok_or_else(|| {
        ApiError::Remote(format!(
            "row {} has a non-numeric id `{id_cell}`",
            row.number
        ))
    })?;

    Ok(User {
        id,
        first_name: text(&columns.first_name),
        last_name: text(&columns.last_name),
        email: text(&columns.email),
    })
}

pub fn to_record(columns: &ColumnMap, user: &User) -> Record {
    Record::from([
        (columns.id.clone(), user.id.to_string()),
        (columns.first_name.clone(), user.first_name.clone()),
        (columns.last_name.clone(), user.last_name.clone()),
        (columns.email.clone(), user.email.clone()),
    ])
}

pub fn patch_record(columns: &ColumnMap, patch: &PartialUser) -> Record {
    let mut record = Record::new();
    if let Some(id) = patch.id {
        record.insert(columns.id.clone(), id.to_string());
    }
    if let Some(v) = &patch.first_name {
        record.insert(columns.first_name.clone(), v.clone());
    }
    if let Some(v) = &patch.last_name {
        record.insert(columns.last_name.clone(), v.clone());
    }
    if let Some(v) = &patch.email {
        record.insert(columns.email.clone(), v.clone());
    }
    record
}

pub fn validate_new_users(users: &[User]) -> Result<(), ApiError> {
    if users.is_empty() {
        return Err(ApiError::Validation("users must be non-empty".into()));
    }
    if let Some(u) = users.iter().find(|u| !is_valid_email(&u.email)) {
        return Err(ApiError::Validation(format!(
            "user {} has an invalid email",
            u.id
        )));
    }
    Ok(())
}

pub fn validate_patch(patch: &PartialUser) -> Result<(), ApiError> {
    if patch.is_empty() {
        return Err(ApiError::Validation("no fields to update".into()));
    }
    if patch.email.as_deref().is_some_and(|e| !is_valid_email(e)) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    Ok(())
}

pub async fn list_users(
    gateway: &dyn SheetGateway,
    columns: &ColumnMap,
) -> Result<Vec<User>, ApiError> {
    let (_, sheet) = sheets::open(gateway).await?;
    let users = sheet
        .rows
        .iter()
        .filter_map(|row| match to_user(&sheet, columns, row) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, row = row.number, "skipping unreadable row");
                None
            }
        })
        .collect();
    Ok(users)
}

pub async fn get_user(
    gateway: &dyn SheetGateway,
    columns: &ColumnMap,
    id: &str,
) -> Result<User, ApiError> {
    let (_, sheet) = sheets::open(gateway).await?;
    let i = find_row(&sheet, columns, id)?;
    to_user(&sheet, columns, &sheet.rows[i])
}

pub async fn create_users(
    gateway: &dyn SheetGateway,
    columns: &ColumnMap,
    users: &[User],
) -> Result<Vec<User>, ApiError> {
    validate_new_users(users)?;
    let (token, sheet) = sheets::open(gateway).await?;

    let records: Vec<Record> = users.iter().map(|u| to_record(columns, u)).collect();
    let rows = gateway.append_rows(&token, &sheet, &records).await?;
    info!(count = rows.len(), "users created");

    rows.iter()
        .map(|row| to_user(&sheet, columns, row))
        .collect()
}

pub async fn update_user(
    gateway: &dyn SheetGateway,
    columns: &ColumnMap,
    id: &str,
    patch: &PartialUser,
) -> Result<(), ApiError> {
    validate_patch(patch)?;
    let (token, sheet) = sheets::open(gateway).await?;
    let i = find_row(&sheet, columns, id)?;

    let row = &sheet.rows[i];
    gateway
        .update_row(&token, &sheet, row, &patch_record(columns, patch))
        .await?;
    info!(%id, row = row.number, "user updated");
    Ok(())
}

pub async fn delete_user(
    gateway: &dyn SheetGateway,
    columns: &ColumnMap,
    id: &str,
) -> Result<(), ApiError> {
    let (token, sheet) = sheets::open(gateway).await?;
    let i = find_row(&sheet, columns, id)?;

    let row = &sheet.rows[i];
    debug!(row = row.number, "deleting row");
    gateway.delete_row(&token, &sheet, row).await?;
    info!(%id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::MemorySheet;

    fn columns() -> ColumnMap {
        ColumnMap::default()
    }

    fn seeded() -> MemorySheet {
        MemorySheet::with_rows(
            vec!["id".into(), "firstName".into(), "lastName".into(), "email".into()],
            vec![
                vec!["1".into(), "Alif".into(), "Baa".into(), "alif@example.com".into()],
                vec!["2".into(), "Taa".into(), "Thaa".into(), "taa@example.com".into()],
            ],
        )
    }

    #[test]
    fn ids_match_loosely() {
        assert!(ids_match("1", "1"));
        assert!(ids_match(" 1 ", "1"));
        assert!(ids_match("01", "1"));
        assert!(ids_match("1.0", "1"));
        assert!(ids_match("abc", "abc"));
        assert!(!ids_match("1", "2"));
        assert!(!ids_match("", ""));
        assert!(!ids_match("abc", "1"));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.io"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no at sign.io"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn patch_record_only_holds_given_fields() {
        let patch = PartialUser {
            first_name: Some("Zed".into()),
            ..Default::default()
        };
        let record = patch_record(&columns(), &patch);
        assert_eq!(record.len(), 1);
        assert_eq!(record["firstName"], "Zed");
    }

    #[test]
    fn custom_id_column_is_used_for_lookup() {
        let sheet = Worksheet {
            sheet_id: 0,
            title: "t".into(),
            headers: vec!["ID".into(), "name".into()],
            rows: vec![Row {
                number: 2,
                values: vec!["7".into(), "x".into()],
            }],
        };
        let mut cols = columns();
        assert!(matches!(find_row(&sheet, &cols, "7"), Err(ApiError::NotFound(_))));
        cols.id = "ID".into();
        assert_eq!(find_row(&sheet, &cols, "7").unwrap(), 0);
    }

    #[test]
    fn non_numeric_id_cell_is_remote_error() {
        let sheet = Worksheet {
            sheet_id: 0,
            title: "t".into(),
            headers: vec!["id".into()],
            rows: vec![Row {
                number: 5,
                values: vec!["abc".into()],
            }],
        };
        let err = to_user(&sheet, &columns(), &sheet.rows[0]).unwrap_err();
        assert!(err.to_string().contains("row 5"));
    }

    #[tokio::test]
    async fn list_skips_rows_with_unreadable_ids() {
        let sheet = MemorySheet::with_rows(
            vec!["id".into(), "firstName".into(), "lastName".into(), "email".into()],
            vec![
                vec!["1".into(), "Alif".into(), "Baa".into(), "alif@example.com".into()],
                vec!["".into(), "half".into(), "edited".into(), "".into()],
                vec!["x".into(), "no".into(), "id".into(), "".into()],
                vec!["2".into(), "Taa".into(), "Thaa".into(), "taa@example.com".into()],
            ],
        );
        let users = list_users(&sheet, &columns()).await.unwrap();
        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn update_keeps_untouched_fields() {
        let sheet = seeded();
        let patch = PartialUser {
            first_name: Some("Zed".into()),
            ..Default::default()
        };
        update_user(&sheet, &columns(), "1", &patch).await.unwrap();

        let user = get_user(&sheet, &columns(), "1").await.unwrap();
        assert_eq!(user.first_name, "Zed");
        assert_eq!(user.last_name, "Baa");
        assert_eq!(user.email, "alif@example.com");
    }

    #[tokio::test]
    async fn create_rejects_empty_batch_and_bad_email() {
        let sheet = seeded();
        let err = create_users(&sheet, &columns(), &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let bad = User {
            id: 3,
            first_name: "a".into(),
            last_name: "b".into(),
            email: "nope".into(),
        };
        let err = create_users(&sheet, &columns(), &[bad]).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(list_users(&sheet, &columns()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_not_found() {
        let sheet = seeded();
        let err = delete_user(&sheet, &columns(), "99").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(id) if id == "99"));
    }
}
