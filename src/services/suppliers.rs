use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::suppliers::{self, Entity as Suppliers, PaymentTerms},
    errors::ServiceError,
    services::{Page, SortOrder},
};

#[derive(Debug, Clone, Default)]
pub struct AddressInput {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateSupplierInput {
    pub supplier_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub address: Option<AddressInput>,
    pub tax_id: Option<String>,
    pub payment_terms: Option<String>,
    pub rating: Option<i16>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSupplierInput {
    pub supplier_name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<AddressInput>,
    pub tax_id: Option<String>,
    pub payment_terms: Option<String>,
    pub rating: Option<i16>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierListFilter {
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: u64,
    pub limit: u64,
}

fn parse_payment_terms(raw: &str) -> Result<PaymentTerms, ServiceError> {
    raw.parse().map_err(|_| {
        ServiceError::ValidationError(format!(
            "Invalid payment terms: {raw}. Must be one of: Net 15, Net 30, Net 45, Net 60, Due on Receipt, Custom"
        ))
    })
}

fn validate_rating(rating: i16) -> Result<(), ServiceError> {
    if !(1..=5).contains(&rating) {
        return Err(ServiceError::ValidationError(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

/// Service for managing suppliers
#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DatabaseConnection>,
}

impl SupplierService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create_supplier(
        &self,
        input: CreateSupplierInput,
        actor_id: Uuid,
    ) -> Result<suppliers::Model, ServiceError> {
        let payment_terms = match input.payment_terms.as_deref() {
            Some(raw) => parse_payment_terms(raw)?,
            None => PaymentTerms::default(),
        };
        let rating = input.rating.unwrap_or(3);
        validate_rating(rating)?;

        let address = input.address.unwrap_or_default();
        let now = Utc::now();
        let supplier = suppliers::ActiveModel {
            id: Set(Uuid::new_v4()),
            supplier_name: Set(input.supplier_name),
            contact_person: Set(input.contact_person),
            email: Set(input.email.trim().to_lowercase()),
            phone: Set(input.phone),
            street: Set(address.street),
            city: Set(address.city),
            state: Set(address.state),
            country: Set(address.country),
            postal_code: Set(address.postal_code),
            tax_id: Set(input.tax_id),
            payment_terms: Set(payment_terms.to_string()),
            rating: Set(rating),
            is_active: Set(true),
            notes: Set(input.notes),
            created_by: Set(actor_id),
            updated_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = supplier.insert(&*self.db).await.map_err(|e| {
            ServiceError::conflict_on_unique(e, "A supplier with this tax ID already exists")
        })?;

        info!(supplier_id = %created.id, "supplier created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_supplier(
        &self,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
        actor_id: Uuid,
    ) -> Result<suppliers::Model, ServiceError> {
        let supplier = self.get_supplier(supplier_id).await?;

        let payment_terms = match input.payment_terms.as_deref() {
            Some(raw) => Some(parse_payment_terms(raw)?.to_string()),
            None => None,
        };
        if let Some(rating) = input.rating {
            validate_rating(rating)?;
        }

        let mut active: suppliers::ActiveModel = supplier.into();
        if let Some(name) = input.supplier_name {
            active.supplier_name = Set(name);
        }
        if let Some(contact) = input.contact_person {
            active.contact_person = Set(contact);
        }
        if let Some(email) = input.email {
            active.email = Set(email.trim().to_lowercase());
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(address) = input.address {
            active.street = Set(address.street);
            active.city = Set(address.city);
            active.state = Set(address.state);
            active.country = Set(address.country);
            active.postal_code = Set(address.postal_code);
        }
        if let Some(tax_id) = input.tax_id {
            active.tax_id = Set(Some(tax_id));
        }
        if let Some(terms) = payment_terms {
            active.payment_terms = Set(terms);
        }
        if let Some(rating) = input.rating {
            active.rating = Set(rating);
        }
        if let Some(notes) = input.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_by = Set(Some(actor_id));
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await.map_err(|e| {
            ServiceError::conflict_on_unique(e, "A supplier with this tax ID already exists")
        })?;

        info!(supplier_id = %supplier_id, "supplier updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_supplier(&self, supplier_id: Uuid) -> Result<suppliers::Model, ServiceError> {
        Suppliers::find_by_id(supplier_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Supplier not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_suppliers(
        &self,
        filter: SupplierListFilter,
    ) -> Result<(Vec<suppliers::Model>, u64), ServiceError> {
        let page = Page::new(filter.page, filter.limit);
        let order = SortOrder::parse(filter.order.as_deref(), SortOrder::Asc)?;
        let column = sort_column(filter.sort_by.as_deref())?;

        let mut query = Suppliers::find();
        if let Some(is_active) = filter.is_active {
            query = query.filter(suppliers::Column::IsActive.eq(is_active));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(suppliers::Column::SupplierName.contains(search))
                    .add(suppliers::Column::Email.contains(search))
                    .add(suppliers::Column::ContactPerson.contains(search)),
            );
        }

        let total = query.clone().count(&*self.db).await?;
        let items = match order {
            SortOrder::Asc => query.order_by_asc(column),
            SortOrder::Desc => query.order_by_desc(column),
        }
        .limit(page.limit)
        .offset(page.offset())
        .all(&*self.db)
        .await?;

        Ok((items, total))
    }

    /// Soft delete; purchase orders keep referencing the inactive supplier.
    #[instrument(skip(self))]
    pub async fn deactivate_supplier(
        &self,
        supplier_id: Uuid,
        actor_id: Uuid,
    ) -> Result<(), ServiceError> {
        let supplier = self.get_supplier(supplier_id).await?;
        let mut active: suppliers::ActiveModel = supplier.into();
        active.is_active = Set(false);
        active.updated_by = Set(Some(actor_id));
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        info!(supplier_id = %supplier_id, "supplier deactivated");
        Ok(())
    }
}

fn sort_column(raw: Option<&str>) -> Result<suppliers::Column, ServiceError> {
    match raw.unwrap_or("supplier_name") {
        "supplier_name" => Ok(suppliers::Column::SupplierName),
        "email" => Ok(suppliers::Column::Email),
        "rating" => Ok(suppliers::Column::Rating),
        "created_at" => Ok(suppliers::Column::CreatedAt),
        other => Err(ServiceError::ValidationError(format!(
            "Invalid sort field '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_terms_parsing() {
        assert_eq!(parse_payment_terms("Net 30").unwrap(), PaymentTerms::Net30);
        assert_eq!(
            parse_payment_terms("Due on Receipt").unwrap(),
            PaymentTerms::DueOnReceipt
        );
        assert!(parse_payment_terms("Net 90").is_err());
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
