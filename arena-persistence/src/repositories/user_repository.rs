use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::{prelude::*, scores, users};
use crate::error::RepoError;
use arena_types::{BulkImportReport, NewUser, User};

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_user(model: users::Model) -> User {
        User {
            id: model.id,
            name: model.name,
            student_id: model.student_id,
            is_admin: model.is_admin,
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let model = Users::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Self::model_to_user))
    }

    pub async fn find_by_student_id(&self, student_id: &str) -> Result<Option<User>, RepoError> {
        let model = Users::find()
            .filter(users::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await?;

        Ok(model.map(Self::model_to_user))
    }

    pub async fn list_all(&self) -> Result<Vec<User>, RepoError> {
        let models = Users::find()
            .order_by_asc(users::Column::StudentId)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Self::model_to_user).collect())
    }

    /// Insert a new user. A taken student id surfaces as
    /// `RepoError::Duplicate` via the unique column, not a pre-read.
    pub async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            student_id: new_user.student_id,
            is_admin: new_user.is_admin,
        };

        let model = users::ActiveModel {
            id: Set(user.id),
            name: Set(user.name.clone()),
            student_id: Set(user.student_id.clone()),
            is_admin: Set(user.is_admin),
        };

        Users::insert(model)
            .exec(&self.db)
            .await
            .map_err(|e| RepoError::from_db(e, &user.student_id))?;

        Ok(user)
    }

    /// Partial-failure tolerant import: duplicated student ids (in
    /// the store or earlier in the same batch) are skipped and
    /// reported, everything else is inserted.
    pub async fn bulk_insert(&self, new_users: Vec<NewUser>) -> Result<BulkImportReport, RepoError> {
        let mut report = BulkImportReport {
            inserted: Vec::new(),
            duplicates: Vec::new(),
        };

        for new_user in new_users {
            let student_id = new_user.student_id.clone();
            match self.create(new_user).await {
                Ok(user) => report.inserted.push(user),
                Err(RepoError::Duplicate(_)) => report.duplicates.push(student_id),
                Err(other) => return Err(other),
            }
        }

        tracing::info!(
            inserted = report.inserted.len(),
            duplicates = report.duplicates.len(),
            "bulk user import finished"
        );

        Ok(report)
    }

    /// Delete a user and every score they submitted, so nothing
    /// orphaned remains queryable.
    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), RepoError> {
        Scores::delete_many()
            .filter(scores::Column::UserId.eq(id))
            .exec(&self.db)
            .await?;

        let result = Users::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
