//! ユースケース層の共通ヘルパー

use requestflow_infra::InfraError;

use crate::error::CoreError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, CoreError>` に変換する
///
/// ```ignore
/// let request = self.request_repo.find_by_ref(&approvable).await.or_not_found("申請")?;
/// ```
pub(crate) trait FindResultExt<T> {
   /// `None` の場合は `CoreError::NotFound`、`InfraError` の場合は `CoreError::Database` を返す
   fn or_not_found(self, entity_name: &str) -> Result<T, CoreError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
   fn or_not_found(self, entity_name: &str) -> Result<T, CoreError> {
      self?.ok_or_else(|| CoreError::NotFound(format!("{entity_name}が見つかりません")))
   }
}
