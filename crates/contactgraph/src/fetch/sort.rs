//! Sort keys of fetch queries.

use super::{order_direction, Binder};
use crate::error::{CompileError, Result};
use crate::request::{BlankPolicy, SortOrder};
use crate::resource::PropertyDescriptor;
use crate::schema::Schema;
use crate::sparql::{OrderCondition, Select};
use crate::vocab::nco;

impl Binder<'_> {
    /// One order condition per sort order, each a scalar sub-select of the sorted value.
    ///
    /// Fails with `NotSupported` when any key cannot be expressed in the query; the caller
    /// then sorts in memory.
    pub(crate) fn bind_sort_orders(&mut self, orders: &[SortOrder]) -> Result<Vec<OrderCondition>> {
        orders
            .iter()
            .map(|order| {
                Ok(OrderCondition {
                    expression: self.bind_sort_order(order)?.into(),
                    direction: order_direction(order),
                })
            })
            .collect()
    }

    fn bind_sort_order(&mut self, order: &SortOrder) -> Result<Select> {
        if order.detail.is_empty() {
            return Err(CompileError::bad_argument(format!(
                "sort order on field {:?} names no detail",
                order.field
            )));
        }

        if order.blank_policy != BlankPolicy::BlanksFirst {
            return Err(CompileError::not_supported("only blanks first sorting"));
        }

        if order.case_sensitive {
            return Err(CompileError::not_supported("case sensitive sorting"));
        }

        if Schema::is_synthetic_detail(&order.detail) {
            return Err(CompileError::not_supported(format!(
                "sorting on synthesized detail {}",
                order.detail
            )));
        }

        let object = self.pool.fresh();
        let mut select = Select::new();
        select.project(&object).limit(1);

        let Some(detail) = self.schema.detail(&order.detail) else {
            let group = self.custom_detail_pattern(
                self.contact(),
                &order.detail,
                Some(&order.field),
                (&object).into(),
            );
            select.restrict_group(group);
            return Ok(select);
        };

        let field = detail
            .field(&order.field)
            .filter(|_| !order.field.is_empty())
            .ok_or_else(|| {
                CompileError::not_supported(format!(
                    "sorting on field {} of detail {}: not in the schema",
                    order.field, order.detail
                ))
            })?;

        if field.is_synthesized {
            return Err(CompileError::not_supported(format!(
                "sorting on synthesized field {}.{}",
                order.detail, order.field
            )));
        }

        if field.has_sub_types() {
            return Err(CompileError::not_supported(format!(
                "sorting on sub-type field {}.{}",
                order.detail, order.field
            )));
        }

        let mut chain = field.property_chain.as_slice().to_vec();
        if detail.has_context {
            chain.insert(
                0,
                PropertyDescriptor::new(nco::HAS_AFFILIATION, nco::PERSON_CONTACT, nco::AFFILIATION)
                    .multi_valued(),
            );
        }

        if field.is_without_mapping {
            let pattern = self.chain_pattern(self.contact(), &chain, None);
            let custom =
                self.custom_field_pattern(pattern.object, Some(&order.field), (&object).into());
            select.restrict_group(pattern.group).restrict_group(custom);
        } else {
            let pattern = self.chain_pattern(self.contact(), &chain, Some((&object).into()));
            select.restrict_group(pattern.group);
        }

        Ok(select)
    }
}
