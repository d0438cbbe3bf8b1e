//! Menu service

use std::sync::Arc;

use crate::domain::entities::{MenuItem, MenuItemId, MenuItemUpdate, NewMenuItem};
use crate::domain::ports::MenuRepository;
use crate::error::AppError;

pub struct MenuService<MR>
where
    MR: MenuRepository + ?Sized,
{
    menu: Arc<MR>,
}

impl<MR> MenuService<MR>
where
    MR: MenuRepository + ?Sized,
{
    pub fn new(menu: Arc<MR>) -> Self {
        Self { menu }
    }

    /// Every item, for staff
    pub async fn list_all(&self) -> Result<Vec<MenuItem>, AppError> {
        Ok(self.menu.list(false).await?)
    }

    /// Items that can be ordered right now
    pub async fn list_available(&self) -> Result<Vec<MenuItem>, AppError> {
        Ok(self.menu.list(true).await?)
    }

    pub async fn get(&self, id: MenuItemId) -> Result<MenuItem, AppError> {
        self.menu
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Menu item {} not found", id)))
    }

    pub async fn create(&self, item: NewMenuItem) -> Result<MenuItem, AppError> {
        item.validate()?;
        let created = self.menu.create(&item).await?;
        tracing::info!(menu_item_id = %created.id, price = created.price, "Created menu item");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: MenuItemId,
        update: MenuItemUpdate,
    ) -> Result<MenuItem, AppError> {
        update.validate()?;
        self.menu
            .update(id, &update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Menu item {} not found", id)))
    }

    pub async fn delete(&self, id: MenuItemId) -> Result<(), AppError> {
        if !self.menu.delete(id).await? {
            return Err(AppError::NotFound(format!("Menu item {} not found", id)));
        }
        Ok(())
    }
}
