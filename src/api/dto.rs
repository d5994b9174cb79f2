// ==========================================
// 室内设计订单流程系统 - API 数据传输对象
// ==========================================
// 职责: 请求体校验, 订单状态视图组装
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::OrderAggregate;
use crate::domain::stage::{Actor, StageResponse};
use crate::domain::task_response::TaskResponse;
use crate::domain::types::{
    ItemPekerjaanStatus, PaymentStatus, RabVariant, Tahap, TaskStatus, WorkflowStage,
};
use serde::{Deserialize, Serialize};

// ==========================================
// 请求体
// ==========================================

/// 操作人
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorDto {
    pub name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_project_manager: bool,
}

impl ActorDto {
    pub fn validate(&self) -> ApiResult<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        Ok(())
    }

    pub fn into_actor(self) -> ApiResult<Actor> {
        self.validate()?;
        let mut actor = Actor::new(self.name.trim());
        if let Some(user_id) = self.user_id.filter(|u| !u.trim().is_empty()) {
            actor = actor.with_user_id(user_id.trim());
        }
        if self.is_project_manager {
            actor = actor.project_manager();
        }
        Ok(actor)
    }
}

/// 任务延期申请
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRequest {
    pub tahap: Tahap,
    pub days: i64,
    pub reason: String,
}

impl ExtensionRequest {
    /// 基础格式校验; 天数上限由配置决定, 在引擎内校验
    pub fn validate(&self) -> ApiResult<()> {
        if self.days < 1 {
            return Err(ApiError::InvalidInput(format!("延期天数必须 >= 1: {}", self.days)));
        }
        if self.reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("延期原因不能为空".to_string()));
        }
        Ok(())
    }
}

// ==========================================
// 订单状态视图
// ==========================================

/// 单个阶段的进度
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageProgress {
    pub tahap: Tahap,
    pub exists: bool,
    pub responded: bool,
    pub approved: bool,
}

impl StageProgress {
    fn missing(tahap: Tahap) -> Self {
        Self {
            tahap,
            exists: false,
            responded: false,
            approved: false,
        }
    }

    fn from_response(tahap: Tahap, response: &StageResponse) -> Self {
        Self {
            tahap,
            exists: true,
            responded: response.is_responded(),
            approved: response.is_approved(),
        }
    }
}

/// 订单状态 (CLI / 前端展示)
#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusView {
    pub order_id: String,
    pub nama_project: String,
    pub customer_name: String,
    pub tahapan: WorkflowStage,
    pub payment_status: Option<String>,
    pub stages: Vec<StageProgress>,
    pub generated_variants: Vec<RabVariant>,
    pub harga_kontrak: Option<f64>,
    pub open_tasks: Vec<TaskResponse>,
    pub overdue_tasks: usize,
}

impl OrderStatusView {
    pub fn build(agg: &OrderAggregate, tasks: Vec<TaskResponse>) -> Self {
        let mut stages = Vec::with_capacity(9);

        stages.push(match &agg.moodboard {
            Some(mb) => {
                let mut p = StageProgress::from_response(Tahap::Moodboard, &mb.response);
                p.approved = mb.accepted;
                p
            }
            None => StageProgress::missing(Tahap::Moodboard),
        });
        stages.push(match &agg.estimasi {
            Some(e) => StageProgress::from_response(Tahap::Estimasi, &e.response),
            None => StageProgress::missing(Tahap::Estimasi),
        });
        stages.push(match &agg.commitment_fee {
            Some(fee) => {
                let mut p = StageProgress::from_response(Tahap::CommitmentFee, &fee.response);
                p.approved = fee.payment_status == PaymentStatus::Completed;
                p
            }
            None => StageProgress::missing(Tahap::CommitmentFee),
        });
        stages.push(match &agg.desain_final {
            Some(df) => {
                let mut p = StageProgress::from_response(Tahap::DesainFinal, &df.response);
                p.approved = df.is_accepted();
                p
            }
            None => StageProgress::missing(Tahap::DesainFinal),
        });
        stages.push(match &agg.item_pekerjaan {
            Some(detail) => {
                let mut p = StageProgress::from_response(Tahap::ItemPekerjaan, &detail.item.response);
                p.approved = detail.item.status == ItemPekerjaanStatus::Published;
                p
            }
            None => StageProgress::missing(Tahap::ItemPekerjaan),
        });
        stages.push(match &agg.rab_internal {
            Some(rab) => {
                let mut p = StageProgress::from_response(Tahap::RabInternal, &rab.response);
                p.approved = rab.is_submitted;
                p
            }
            None => StageProgress::missing(Tahap::RabInternal),
        });
        stages.push(match &agg.kontrak {
            Some(k) => StageProgress::from_response(Tahap::Kontrak, &k.response),
            None => StageProgress::missing(Tahap::Kontrak),
        });
        stages.push(match &agg.gambar_kerja {
            Some(gk) => StageProgress::from_response(Tahap::GambarKerja, &gk.response),
            None => StageProgress::missing(Tahap::GambarKerja),
        });

        let overdue_tasks = tasks.iter().filter(|t| t.status == TaskStatus::Telat).count();
        let open_tasks = tasks
            .into_iter()
            .filter(|t| t.status.is_open() || t.status == TaskStatus::Telat)
            .collect();

        Self {
            order_id: agg.order.order_id.clone(),
            nama_project: agg.order.nama_project.clone(),
            customer_name: agg.order.customer_name.clone(),
            tahapan: agg.order.tahapan,
            payment_status: agg.order.payment_status.clone(),
            stages,
            generated_variants: agg.rab_variants.iter().map(|v| v.variant).collect(),
            harga_kontrak: agg.kontrak.as_ref().map(|k| k.harga_kontrak),
            open_tasks,
            overdue_tasks,
        }
    }

    pub fn stage(&self, tahap: Tahap) -> Option<&StageProgress> {
        self.stages.iter().find(|s| s.tahap == tahap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_dto_validation() {
        let dto = ActorDto {
            name: "  ".to_string(),
            user_id: None,
            is_project_manager: false,
        };
        assert!(matches!(dto.into_actor(), Err(ApiError::InvalidInput(_))));

        let dto = ActorDto {
            name: " Rina ".to_string(),
            user_id: Some("u-7".to_string()),
            is_project_manager: true,
        };
        let actor = dto.into_actor().unwrap();
        assert_eq!(actor.name, "Rina");
        assert_eq!(actor.user_id.as_deref(), Some("u-7"));
        assert!(actor.is_project_manager);
    }

    #[test]
    fn test_extension_request_validation() {
        let ok = ExtensionRequest {
            tahap: Tahap::Moodboard,
            days: 2,
            reason: "客户出差".to_string(),
        };
        assert!(ok.validate().is_ok());

        let zero = ExtensionRequest { days: 0, ..ok.clone() };
        assert!(zero.validate().is_err());

        let blank = ExtensionRequest {
            reason: " ".to_string(),
            ..ok
        };
        assert!(blank.validate().is_err());
    }
}
