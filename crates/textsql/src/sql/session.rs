use super::{connect, quote_identifier, Driver, Engine, ResultSink};
use crate::error::DriverError;

/// Owns the single connection used by one query run.
///
/// Tables created during the run live as long as the session; dropping the
/// session disconnects and so discards them.
pub struct Session {
    driver: Option<Box<dyn Driver>>,
}

impl Session {
    pub fn connect(engine: Engine, dsn: &str) -> Result<Self, DriverError> {
        Ok(Self::from_driver(connect(engine, dsn)?))
    }

    pub fn from_driver(driver: Box<dyn Driver>) -> Self {
        Self {
            driver: Some(driver),
        }
    }

    pub fn driver(&mut self) -> Result<&mut (dyn Driver + 'static), DriverError> {
        match self.driver.as_deref_mut() {
            Some(driver) => Ok(driver),
            None => Err(DriverError::Disconnected),
        }
    }

    pub fn quote_identifier(&self, ident: &str) -> String {
        match self.driver.as_deref() {
            Some(driver) => driver.quote_identifier(ident),
            None => quote_identifier(ident),
        }
    }

    pub fn exec(&mut self, sql: &str) -> Result<(), DriverError> {
        self.driver()?.exec(sql)
    }

    pub fn query(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<(), DriverError> {
        self.driver()?.query(sql, sink)
    }

    pub fn disconnect(&mut self) -> Result<(), DriverError> {
        match self.driver.take() {
            Some(driver) => driver.disconnect(),
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.disconnect() {
                tracing::warn!("Failed to disconnect: {:?}", e);
            }
        }
    }
}
