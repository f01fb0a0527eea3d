/// Who is asking for a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOrigin {
    Operator,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent {
    StockUpdate { product: String, new_stock: i64, origin: ActionOrigin },
    StockAdjustment { product: String, delta: i64, origin: ActionOrigin },
}

impl GuardrailIntent {
    pub fn product(&self) -> &str {
        match self {
            Self::StockUpdate { product, .. } | Self::StockAdjustment { product, .. } => product,
        }
    }

    pub fn origin(&self) -> ActionOrigin {
        match self {
            Self::StockUpdate { origin, .. } | Self::StockAdjustment { origin, .. } => *origin,
        }
    }

    pub fn action_key(&self) -> &'static str {
        match self {
            Self::StockUpdate { .. } => "inventory.set_stock",
            Self::StockAdjustment { .. } => "inventory.adjust_stock",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

impl GuardrailDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub model_can_write_stock: bool,
    pub max_stock_level: i64,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { model_can_write_stock: true, max_stock_level: 1_000_000 }
    }
}

impl GuardrailPolicy {
    pub fn read_only_model() -> Self {
        Self { model_can_write_stock: false, ..Self::default() }
    }

    pub fn evaluate(&self, intent: &GuardrailIntent) -> GuardrailDecision {
        if intent.origin() == ActionOrigin::Model && !self.model_can_write_stock {
            return GuardrailDecision::Degrade {
                reason_code: "model_stock_writes_disabled",
                user_message: format!(
                    "Stock changes for {} must be made by an operator. Use the inventory API or CLI.",
                    intent.product()
                ),
                fallback_path: "operator_stock_update",
            };
        }

        match intent {
            GuardrailIntent::StockUpdate { new_stock, .. } if *new_stock < 0 => {
                GuardrailDecision::Deny {
                    reason_code: "negative_stock_disallowed",
                    user_message: format!(
                        "Stock for {} cannot be set to {new_stock}. Stock levels must be zero or more.",
                        intent.product()
                    ),
                    fallback_path: "request_valid_stock_level",
                }
            }
            GuardrailIntent::StockUpdate { new_stock, .. } if *new_stock > self.max_stock_level => {
                GuardrailDecision::Deny {
                    reason_code: "stock_above_ceiling",
                    user_message: format!(
                        "Stock for {} cannot exceed {} units in one update.",
                        intent.product(),
                        self.max_stock_level
                    ),
                    fallback_path: "request_valid_stock_level",
                }
            }
            GuardrailIntent::StockAdjustment { delta, .. } if delta.abs() > self.max_stock_level => {
                GuardrailDecision::Deny {
                    reason_code: "stock_above_ceiling",
                    user_message: format!(
                        "Adjustments for {} are limited to {} units.",
                        intent.product(),
                        self.max_stock_level
                    ),
                    fallback_path: "request_valid_stock_level",
                }
            }
            _ => GuardrailDecision::Allow,
        }
    }
}
