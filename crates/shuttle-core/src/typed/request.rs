//! Request trait - request type と payload 型の対応付け

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Request binds a request type string to a payload type and its output.
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Sum {
///     a: i64,
///     b: i64,
/// }
///
/// impl Request for Sum {
///     const TYPE: &'static str = "sum";
///     type Output = i64;
/// }
/// ```
///
/// # Trait Bounds
/// - `DeserializeOwned`: JobDescriptor の payload から復元するため
/// - `Output: Serialize`: ResultPayload の value に入れるため
/// - `Send + Sync + 'static`: Arc<dyn Executor> に格納するため
pub trait Request: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    type Output: Serialize + Send;
}
