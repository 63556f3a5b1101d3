mod modify;
mod persistence;
mod reports;
