use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};

use crate::db::entities::{category, contact};
use crate::validation::ValidContact;

// --- Contact Service Functions ---

/// Most recently created visible contacts, newest first.
pub async fn list_visible_contacts(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<contact::Model>, DbErr> {
    contact::Entity::find()
        .filter(contact::Column::Show.eq(true))
        .order_by_desc(contact::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// Visible contacts whose first name, last name, phone or email contains
/// `query`, ignoring case, newest first. An empty query matches every
/// visible contact.
pub async fn search_visible_contacts(
    db: &DatabaseConnection,
    query: &str,
) -> Result<Vec<contact::Model>, DbErr> {
    let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

    let any_field = Condition::any()
        .add(icontains(contact::Column::FirstName, &pattern))
        .add(icontains(contact::Column::LastName, &pattern))
        .add(icontains(contact::Column::Phone, &pattern))
        .add(icontains(contact::Column::Email, &pattern));

    contact::Entity::find()
        .filter(contact::Column::Show.eq(true))
        .filter(any_field)
        .order_by_desc(contact::Column::Id)
        .all(db)
        .await
}

/// The contact with `id`, only if it is visible.
pub async fn find_visible_contact(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<contact::Model>, DbErr> {
    contact::Entity::find_by_id(id)
        .filter(contact::Column::Show.eq(true))
        .one(db)
        .await
}

/// The contact with `id` when it belongs to `owner_id`, hidden or not.
pub async fn find_owned_contact(
    db: &DatabaseConnection,
    id: i32,
    owner_id: i32,
) -> Result<Option<contact::Model>, DbErr> {
    contact::Entity::find_by_id(id)
        .filter(contact::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
}

pub async fn create_contact(
    db: &DatabaseConnection,
    owner_id: Option<i32>,
    data: ValidContact,
) -> Result<contact::Model, DbErr> {
    let new_contact = contact::ActiveModel {
        first_name: Set(data.first_name),
        last_name: Set(data.last_name),
        phone: Set(data.phone),
        email: Set(data.email),
        description: Set(data.description),
        category_id: Set(data.category_id),
        picture: Set(data.picture),
        owner_id: Set(owner_id),
        show: Set(true),
        created_date: Set(Utc::now()),
        ..Default::default()
    };
    new_contact.insert(db).await
}

/// Overwrites the editable fields; visibility, owner and creation date are kept.
pub async fn update_contact(
    db: &DatabaseConnection,
    existing: contact::Model,
    data: ValidContact,
) -> Result<contact::Model, DbErr> {
    let mut active: contact::ActiveModel = existing.into();
    active.first_name = Set(data.first_name);
    active.last_name = Set(data.last_name);
    active.phone = Set(data.phone);
    active.email = Set(data.email);
    active.description = Set(data.description);
    active.category_id = Set(data.category_id);
    active.picture = Set(data.picture);
    active.update(db).await
}

pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>, DbErr> {
    category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
}

fn icontains(column: contact::Column, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

/// Makes `%`, `_` and `\` match literally inside a LIKE pattern.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_db;

    async fn insert(db: &DatabaseConnection, first_name: &str, show: bool) -> contact::Model {
        contact::ActiveModel {
            first_name: Set(first_name.to_string()),
            last_name: Set("Doe".to_string()),
            phone: Set("555-0100".to_string()),
            email: Set(format!("{}@example.com", first_name.to_lowercase())),
            description: Set(String::new()),
            show: Set(show),
            created_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("joe"), "joe");
    }

    #[tokio::test]
    async fn index_returns_ten_most_recent_visible() {
        let db = memory_db().await;
        let mut visible_ids = Vec::new();
        for i in 0..18 {
            // every sixth contact is hidden: 3 hidden, 15 visible
            let show = i % 6 != 5;
            let contact = insert(&db, &format!("Person{i}"), show).await;
            if show {
                visible_ids.push(contact.id);
            }
        }
        assert_eq!(visible_ids.len(), 15);

        let contacts = list_visible_contacts(&db, 10).await.unwrap();
        let ids: Vec<i32> = contacts.iter().map(|c| c.id).collect();
        let expected: Vec<i32> = visible_ids.iter().rev().take(10).copied().collect();
        assert_eq!(ids, expected);
        assert!(contacts.iter().all(|c| c.show));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_skips_hidden() {
        let db = memory_db().await;
        let joe = insert(&db, "Joe", true).await;
        insert(&db, "Joey", false).await;
        insert(&db, "Mary", true).await;

        let found = search_visible_contacts(&db, "joe").await.unwrap();
        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), [joe.id]);
    }

    #[tokio::test]
    async fn search_matches_any_field_newest_first() {
        let db = memory_db().await;
        let by_phone = contact::ActiveModel {
            first_name: Set("Ann".into()),
            last_name: Set("Lee".into()),
            phone: Set("9876".into()),
            email: Set("ann@mail.org".into()),
            description: Set(String::new()),
            show: Set(true),
            created_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let by_email = insert(&db, "Bob", true).await; // bob@example.com

        assert_eq!(
            search_visible_contacts(&db, "987").await.unwrap()[0].id,
            by_phone.id
        );
        let found = search_visible_contacts(&db, "EXAMPLE.COM").await.unwrap();
        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), [by_email.id]);
        let found = search_visible_contacts(&db, "LEE").await.unwrap();
        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), [by_phone.id]);
    }

    #[tokio::test]
    async fn empty_search_returns_every_visible_contact() {
        let db = memory_db().await;
        let first = insert(&db, "Joe", true).await;
        insert(&db, "Hidden", false).await;
        let second = insert(&db, "Mary", true).await;

        let found = search_visible_contacts(&db, "").await.unwrap();
        assert_eq!(
            found.iter().map(|c| c.id).collect::<Vec<_>>(),
            [second.id, first.id]
        );
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let db = memory_db().await;
        insert(&db, "Joe", true).await;

        assert!(search_visible_contacts(&db, "%").await.unwrap().is_empty());
        assert!(search_visible_contacts(&db, "j_e").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hidden_contact_is_not_found() {
        let db = memory_db().await;
        let hidden = insert(&db, "Hidden", false).await;
        let shown = insert(&db, "Shown", true).await;

        assert!(find_visible_contact(&db, hidden.id).await.unwrap().is_none());
        assert!(find_visible_contact(&db, 9999).await.unwrap().is_none());
        assert_eq!(
            find_visible_contact(&db, shown.id).await.unwrap().map(|c| c.id),
            Some(shown.id)
        );
    }

    #[tokio::test]
    async fn update_keeps_visibility_and_owner() {
        let db = memory_db().await;
        let hidden = insert(&db, "Hidden", false).await;

        let updated = update_contact(
            &db,
            hidden.clone(),
            ValidContact {
                first_name: "Renamed".into(),
                last_name: "Doe".into(),
                phone: "1".into(),
                email: String::new(),
                description: "notes".into(),
                category_id: None,
                picture: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.first_name, "Renamed");
        assert!(!updated.show);
        assert_eq!(updated.owner_id, hidden.owner_id);
        assert_eq!(updated.created_date, hidden.created_date);
    }
}
