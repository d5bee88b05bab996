use thiserror::Error;

use crate::store::StoreError;

/// 启动和运行期错误
///
/// 请求级错误走 [`shared::AppError`]，这里只覆盖服务器生命周期
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 服务器生命周期 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
