use crate::common::Direction;
use crate::engine::entity::OptionPick;
use crate::engine::error::SelectionError;
use async_trait::async_trait;

/// # Summary
/// 将合格突破映射为可交易期权合约的接口。
///
/// # Invariants
/// - 实现不得重试；失败直接返回 `SelectionError`，由扫描器丢弃该候选。
#[async_trait]
pub trait ContractResolver: Send + Sync {
    /// # Summary
    /// 根据入场价与方向选出实值合约并给出权利金目标/止损。
    ///
    /// # Arguments
    /// * `entry_price`: 标的入场价 (前一根 K 线收盘价)。
    /// * `direction`: 突破方向。
    ///
    /// # Returns
    /// 成功返回 `OptionPick`。
    async fn resolve(
        &self,
        entry_price: f64,
        direction: Direction,
    ) -> Result<OptionPick, SelectionError>;
}
