//! Account repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use sis_core::error::{AppError, ErrorKind};
use sis_core::result::AppResult;
use sis_entity::admin::AdminProfile;
use sis_entity::profile::{
    AdminEnrollment, AssignedProfile, RoleAssignment, StudentEnrollment, StudentProfile,
    TeacherEnrollment, TeacherProfile,
};
use sis_entity::user::{NewAccount, User, UserRole};

use super::{admin, write_error};
use crate::rules;
use crate::store::{AccountConflicts, AccountStore, PurgeReport};

/// Postgres-backed [`AccountStore`].
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new account repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

/// Lock the account row and return its role.
async fn lock_role(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<UserRole>> {
    sqlx::query_scalar::<_, UserRole>(
        "SELECT role FROM users WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error("Failed to lock account"))
}

async fn set_role(conn: &mut PgConnection, user_id: Uuid, role: UserRole) -> AppResult<()> {
    sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(role)
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to update account role"))?;
    Ok(())
}

async fn enroll_student(
    conn: &mut PgConnection,
    user_id: Uuid,
    enrollment: &StudentEnrollment,
) -> AppResult<StudentProfile> {
    let class_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM classes WHERE id = $1)")
            .bind(enrollment.class_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error("Failed to check class"))?;
    if !class_exists {
        return Err(rules::class_not_found());
    }

    let guardians = sqlx::query_scalar::<_, Uuid>("SELECT id FROM parents WHERE id = ANY($1)")
        .bind(&enrollment.guardian_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to load parents"))?;
    if guardians.len() != 2 {
        return Err(rules::guardian_count());
    }

    let nisn_taken =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM students WHERE nisn = $1)")
            .bind(&enrollment.nisn)
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error("Failed to check NISN"))?;
    if nisn_taken {
        return Err(rules::nisn_taken());
    }

    let profile = sqlx::query_as::<_, StudentProfile>(
        "INSERT INTO students (user_id, class_id, nisn) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(enrollment.class_id)
    .bind(&enrollment.nisn)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| write_error(e, "Failed to create student profile"))?;

    sqlx::query("INSERT INTO student_parents (student_id, parent_id) SELECT $1, UNNEST($2::uuid[])")
        .bind(profile.id)
        .bind(&guardians)
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error(e, "Failed to link parents"))?;

    Ok(profile)
}

async fn enroll_teacher(
    conn: &mut PgConnection,
    user_id: Uuid,
    enrollment: &TeacherEnrollment,
) -> AppResult<TeacherProfile> {
    let mut subject_ids = enrollment.subject_ids.clone();
    subject_ids.sort_unstable();
    subject_ids.dedup();

    let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM subjects WHERE id = ANY($1)")
        .bind(&subject_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to load subjects"))?;
    if found.len() < subject_ids.len() {
        return Err(rules::subjects_missing(subject_ids.len() - found.len()));
    }

    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM teachers WHERE nuptk = $1 OR employee_id = $2)",
    )
    .bind(&enrollment.nuptk)
    .bind(&enrollment.employee_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error("Failed to check teacher identifiers"))?;
    if taken {
        return Err(rules::teacher_ids_taken());
    }

    let profile = sqlx::query_as::<_, TeacherProfile>(
        "INSERT INTO teachers (user_id, nuptk, employee_id, joined_at) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(user_id)
    .bind(&enrollment.nuptk)
    .bind(&enrollment.employee_id)
    .bind(enrollment.joined_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| write_error(e, "Failed to create teacher profile"))?;

    sqlx::query("INSERT INTO teacher_subjects (teacher_id, subject_id) SELECT $1, UNNEST($2::uuid[])")
        .bind(profile.id)
        .bind(&found)
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error(e, "Failed to link subjects"))?;

    Ok(profile)
}

async fn enroll_admin(
    conn: &mut PgConnection,
    user_id: Uuid,
    enrollment: &AdminEnrollment,
) -> AppResult<AdminProfile> {
    if admin::employee_id_taken(conn, &enrollment.employee_id).await? {
        return Err(rules::admin_employee_id_taken());
    }
    admin::insert_profile(conn, user_id, enrollment).await
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find user by id"))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find user by email"))
    }

    async fn find_conflicts(&self, email: &str, phone: &str) -> AppResult<AccountConflicts> {
        let (email, phone) = sqlx::query_as::<_, (bool, bool)>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1)), \
                    EXISTS (SELECT 1 FROM users WHERE phone = $2)",
        )
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check account uniqueness"))?;
        Ok(AccountConflicts { email, phone })
    }

    async fn create(&self, account: NewAccount) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (full_name, email, password_hash, gender, phone) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&account.full_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.gender)
        .bind(&account.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "Failed to create user"))
    }

    async fn admin_exists(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin' AND deleted_at IS NULL)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check for admins"))
    }

    async fn promote_to_admin(
        &self,
        user_id: Uuid,
        enrollment: &AdminEnrollment,
        grants: &[Uuid],
    ) -> AppResult<AdminProfile> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        let promoted = sqlx::query(
            "UPDATE users SET role = 'admin', updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             AND NOT EXISTS (SELECT 1 FROM users WHERE role = 'admin' AND deleted_at IS NULL)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to promote admin"))?;
        if promoted.rows_affected() == 0 {
            let live = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)",
            )
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to look up promoted user"))?;
            return Err(if live {
                rules::admin_already_exists()
            } else {
                rules::user_not_found()
            });
        }

        let profile = enroll_admin(&mut tx, user_id, enrollment).await?;
        for permission_id in grants {
            admin::append_grant(&mut tx, profile.id, *permission_id).await?;
        }

        tx.commit().await.map_err(db_error("Failed to commit admin bootstrap"))?;
        Ok(profile)
    }

    async fn assign_role(
        &self,
        user_id: Uuid,
        assignment: &RoleAssignment,
    ) -> AppResult<AssignedProfile> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        match lock_role(&mut tx, user_id).await? {
            None => return Err(rules::user_not_found()),
            Some(role) if !role.is_unset() => return Err(rules::role_already_assigned(role)),
            Some(_) => {}
        }

        let profile = match assignment {
            RoleAssignment::Student(e) => {
                AssignedProfile::Student(enroll_student(&mut tx, user_id, e).await?)
            }
            RoleAssignment::Teacher(e) => {
                AssignedProfile::Teacher(enroll_teacher(&mut tx, user_id, e).await?)
            }
            RoleAssignment::Admin(e) => {
                AssignedProfile::Admin(enroll_admin(&mut tx, user_id, e).await?)
            }
        };
        set_role(&mut tx, user_id, assignment.role()).await?;

        tx.commit().await.map_err(db_error("Failed to commit role assignment"))?;
        Ok(profile)
    }

    async fn soft_delete(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to soft-delete user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_soft_deleted(&self, cutoff: DateTime<Utc>) -> AppResult<PurgeReport> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        let candidates = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT sp.parent_id FROM student_parents sp \
             JOIN students s ON s.id = sp.student_id \
             JOIN users u ON u.id = s.user_id \
             WHERE u.deleted_at IS NOT NULL AND u.deleted_at <= $1",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to collect guardians of purged accounts"))?;

        let accounts = sqlx::query(
            "DELETE FROM users WHERE deleted_at IS NOT NULL AND deleted_at <= $1",
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to purge soft-deleted users"))?
        .rows_affected();

        let guardians = if candidates.is_empty() {
            0
        } else {
            sqlx::query(
                "DELETE FROM parents p WHERE p.id = ANY($1) \
                 AND NOT EXISTS (SELECT 1 FROM student_parents sp WHERE sp.parent_id = p.id)",
            )
            .bind(&candidates)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to purge orphaned parents"))?
            .rows_affected()
        };

        tx.commit().await.map_err(db_error("Failed to commit purge"))?;
        Ok(PurgeReport { accounts, guardians })
    }
}
