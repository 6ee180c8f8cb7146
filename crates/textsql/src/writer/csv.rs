use super::{WriteOptions, Writer};
use crate::error::WriteError;
use crate::models::{ResultColumn, Value};
use ::csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::Write;

pub struct CsvWriter<'a> {
    inner: ::csv::Writer<Box<dyn Write + 'a>>,
    header: bool,
    width: usize,
}

impl<'a> CsvWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>, options: &WriteOptions) -> Self {
        let delimiter = options
            .delimiter
            .as_deref()
            .and_then(|d| d.as_bytes().first().copied())
            .unwrap_or(b',');
        let quote_style = if options.quote_all {
            QuoteStyle::Always
        } else {
            QuoteStyle::Necessary
        };
        let inner = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(quote_style)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);
        Self {
            inner,
            header: options.header,
            width: 0,
        }
    }
}

impl Writer for CsvWriter<'_> {
    fn pre_write(&mut self, columns: &[ResultColumn]) -> Result<(), WriteError> {
        self.width = columns.len();
        if self.header && self.width > 0 {
            self.inner
                .write_record(columns.iter().map(|c| c.name.as_bytes()))?;
        }
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<(), WriteError> {
        if self.width == 0 {
            return Ok(());
        }
        let cells: Vec<_> = values.iter().map(Value::render).collect();
        self.inner.write_record(cells.iter().map(|c| c.as_bytes()))?;
        Ok(())
    }

    fn post_write(&mut self) -> Result<(), WriteError> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::render;
    use super::super::{OutputFormat, WriteOptions};

    #[test]
    fn test_csv_without_header() {
        assert_eq!(
            render(OutputFormat::Csv, &WriteOptions::default()),
            "1,Orange\n2,\n"
        );
    }

    #[test]
    fn test_csv_with_header_and_delimiter() {
        let options = WriteOptions {
            header: true,
            delimiter: Some("\t".into()),
            quote_all: false,
        };
        assert_eq!(
            render(OutputFormat::Csv, &options),
            "id\tname\n1\tOrange\n2\t\n"
        );
    }

    #[test]
    fn test_csv_quote_all() {
        let options = WriteOptions {
            quote_all: true,
            ..WriteOptions::default()
        };
        assert_eq!(
            render(OutputFormat::Csv, &options),
            "\"1\",\"Orange\"\n\"2\",\"\"\n"
        );
    }
}
